//! Configuration management
//!
//! Unified configuration for the spectrogram-translation pipeline: dataset
//! location, model dimensions, and the training/sampling lifecycle. Loads
//! and saves both TOML and JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::SIZE_MULTIPLE;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingSection,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory containing dataset directories
    pub root: String,
    /// Dataset directory name under the root
    pub dataset_name: String,
    /// Paired samples per batch
    pub batch_size: usize,
    /// Cap on samples consumed per epoch
    pub train_size: usize,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Spatial resolution of every spectrogram (square)
    pub output_size: i64,
    /// Channels in the source spectrogram
    pub input_c_dim: i64,
    /// Channels in the target spectrogram
    pub output_c_dim: i64,
    /// Generator filters in the first encoder stage
    pub gf_dim: i64,
    /// Discriminator filters in the first stage
    pub df_dim: i64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSection {
    /// Number of epochs
    pub epochs: usize,
    /// Learning rate for both optimizers
    pub lr: f64,
    /// Adam first-moment coefficient
    pub beta1: f64,
    /// Discriminator updates per batch
    pub d_steps: usize,
    /// Generator updates per batch
    pub g_steps: usize,
    /// Weight of the L1 reconstruction term
    pub l1_lambda: f64,
    /// Weight of the L2 reconstruction term
    pub l2_lambda: f64,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Sample output directory
    pub sample_dir: String,
    /// Test input/output directory
    pub test_dir: String,
    /// Log directory for loss curves
    pub log_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root: ".".to_string(),
                dataset_name: "specgrams".to_string(),
                batch_size: 1,
                train_size: 100_000_000,
            },
            model: ModelConfig {
                output_size: 1024,
                input_c_dim: 1,
                output_c_dim: 1,
                gf_dim: 64,
                df_dim: 64,
            },
            training: TrainingSection {
                epochs: 200,
                lr: 2e-4,
                beta1: 0.5,
                d_steps: 1,
                g_steps: 1,
                l1_lambda: 100.0,
                l2_lambda: 0.0,
                checkpoint_dir: "checkpoints".to_string(),
                sample_dir: "samples".to_string(),
                test_dir: "test".to_string(),
                log_dir: "logs".to_string(),
                device: "cpu".to_string(),
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_toml(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_json(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from either format based on the file extension.
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        if path.ends_with(".toml") {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.output_size <= 0 || self.model.output_size % SIZE_MULTIPLE != 0 {
            anyhow::bail!(
                "output_size must be a positive multiple of {}",
                SIZE_MULTIPLE
            );
        }
        if self.model.input_c_dim <= 0 || self.model.output_c_dim <= 0 {
            anyhow::bail!("channel dimensions must be > 0");
        }
        if self.model.gf_dim <= 0 || self.model.df_dim <= 0 {
            anyhow::bail!("filter dimensions must be > 0");
        }
        if self.data.batch_size == 0 {
            anyhow::bail!("batch_size must be > 0");
        }
        if self.data.train_size == 0 {
            anyhow::bail!("train_size must be > 0");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("epochs must be > 0");
        }
        if self.training.d_steps == 0 || self.training.g_steps == 0 {
            anyhow::bail!("d_steps and g_steps must each be >= 1");
        }
        Ok(())
    }
}

/// Load the configuration at `path`, or create a default one there.
pub fn ensure_config_exists(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::from_path(path)
    } else {
        let config = Config::default();
        if path.ends_with(".toml") {
            config.save_toml(path)?;
        } else {
            config.save_json(path)?;
        }
        Ok(config)
    }
}
