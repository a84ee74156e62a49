//! Pix2Pix Audio Spectrogram Translation
//!
//! Main entry point providing CLI interface for:
//! - Initializing a configuration file
//! - Training the translation model
//! - Sampling the current model on random training pairs
//! - Evaluating the model on a test directory

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_pix2pix_specgram::{
    data::PairedDataset,
    model::Pix2Pix,
    sampling::{run_test, sample_model, NullWaveformSink},
    training::{Trainer, TrainingConfig},
    utils::{ensure_config_exists, load_latest_checkpoint, Config},
};

/// Conditional GAN for paired audio spectrogram translation
#[derive(Parser)]
#[command(name = "pix2pix_specgram")]
#[command(version = "0.1.0")]
#[command(about = "Translate source audio spectrograms into target spectrograms")]
struct Cli {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Train the translation model
    Train {
        /// Number of epochs (overrides the configuration)
        #[arg(short, long)]
        epochs: Option<usize>,
    },

    /// Sample the latest checkpointed model on random training pairs
    Sample {
        /// Number of sample batches to draw
        #[arg(short, long, default_value = "5")]
        count: usize,
    },

    /// Evaluate the latest checkpointed model on the test directory
    Test,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Train { epochs } => {
            train_model(&cli.config, epochs)?;
        }
        Commands::Sample { count } => {
            sample_current(&cli.config, count)?;
        }
        Commands::Test => {
            test_model(&cli.config)?;
        }
    }

    Ok(())
}

/// Write a default configuration file.
fn init_config(output: &str) -> Result<()> {
    let config = ensure_config_exists(output)?;
    config.validate()?;
    info!("configuration written to {}", output);
    Ok(())
}

/// Load configuration, build the model and run the training loop.
fn train_model(config_path: &str, epochs: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    let device = config.get_device();
    info!("using device: {:?}", device);

    let dataset = PairedDataset::open(
        Path::new(&config.data.root),
        &config.data.dataset_name,
        config.model.output_size,
        config.model.input_c_dim,
        config.model.output_c_dim,
    )?;
    info!("dataset: {} paired samples", dataset.len());

    let mut model = build_model(&config)?;

    let training_config = TrainingConfig {
        epochs: epochs.unwrap_or(config.training.epochs),
        lr: config.training.lr,
        beta1: config.training.beta1,
        d_steps: config.training.d_steps,
        g_steps: config.training.g_steps,
        batch_size: config.data.batch_size,
        l1_lambda: config.training.l1_lambda,
        l2_lambda: config.training.l2_lambda,
        train_size: config.data.train_size,
        checkpoint_dir: config.training.checkpoint_dir.clone().into(),
        sample_dir: config.training.sample_dir.clone().into(),
        log_dir: config.training.log_dir.clone().into(),
    };

    let mut trainer = Trainer::new(training_config, device);
    let metrics = trainer.train(&mut model, &dataset)?;

    info!(
        "final losses after {} steps: d {:.6} g {:.6}",
        metrics.num_steps(),
        metrics.latest_d_loss().unwrap_or(f64::NAN),
        metrics.latest_g_loss().unwrap_or(f64::NAN),
    );
    Ok(())
}

/// Draw sample batches from the training set with the latest checkpoint.
fn sample_current(config_path: &str, count: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let device = config.get_device();

    let dataset = PairedDataset::open(
        Path::new(&config.data.root),
        &config.data.dataset_name,
        config.model.output_size,
        config.model.input_c_dim,
        config.model.output_c_dim,
    )?;

    let mut model = build_model(&config)?;
    restore_latest(&mut model, &config)?;

    let sample_dir = Path::new(&config.training.sample_dir);
    std::fs::create_dir_all(sample_dir)?;

    for idx in 0..count {
        sample_model(
            &model,
            &dataset,
            sample_dir,
            0,
            idx,
            config.data.batch_size,
            config.training.l1_lambda,
            config.training.l2_lambda,
        )?;
    }
    info!("wrote {} sample batches to {}", count, sample_dir.display());
    Ok(())
}

/// Evaluate the latest checkpoint on the configured test directory.
fn test_model(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;

    let mut model = build_model(&config)?;
    restore_latest(&mut model, &config)?;

    run_test(
        &model,
        Path::new(&config.training.test_dir),
        config.data.batch_size,
        &NullWaveformSink,
    )
}

fn load_config(path: &str) -> Result<Config> {
    let config = if Path::new(path).exists() {
        Config::from_path(path)?
    } else {
        info!("config file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

fn build_model(config: &Config) -> Result<Pix2Pix> {
    Pix2Pix::from_dims(
        config.model.output_size,
        config.model.input_c_dim,
        config.model.output_c_dim,
        config.model.gf_dim,
        config.model.df_dim,
        config.get_device(),
    )
}

fn restore_latest(model: &mut Pix2Pix, config: &Config) -> Result<()> {
    match load_latest_checkpoint(model, Path::new(&config.training.checkpoint_dir))? {
        Some((meta, _)) => info!("restored checkpoint at step {}", meta.step),
        None => info!("no checkpoint found, using fresh parameters"),
    }
    Ok(())
}
