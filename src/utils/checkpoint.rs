//! Checkpoint save/load utilities
//!
//! A checkpoint is a step-keyed directory holding both networks' parameter
//! snapshots, metadata and the metric history. The latest checkpoint is
//! resolved from the zero-padded step number in the directory name.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::Pix2Pix;
use crate::training::{TrainState, TrainingMetrics};

const CHECKPOINT_PREFIX: &str = "checkpoint_step_";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Optimization step the snapshot was taken at
    pub step: i64,
    /// Epoch index at snapshot time
    pub epoch: usize,
    /// Discriminator loss at snapshot time
    pub d_loss: f64,
    /// Generator loss at snapshot time
    pub g_loss: f64,
    /// Timestamp of the snapshot
    pub timestamp: String,
    /// Model dimensions (as JSON)
    pub model: String,
}

/// Directory name encoding the step, zero-padded so name order is step order.
pub fn checkpoint_name(step: i64) -> String {
    format!("{CHECKPOINT_PREFIX}{step:08}")
}

/// Persist all current parameter values, keyed by the training step.
///
/// # Returns
///
/// Path of the created checkpoint directory.
pub fn save_checkpoint(
    model: &Pix2Pix,
    metrics: &TrainingMetrics,
    state: &TrainState,
    dir: &Path,
) -> Result<PathBuf> {
    let checkpoint_dir = dir.join(checkpoint_name(state.step));
    std::fs::create_dir_all(&checkpoint_dir)?;

    model.save(
        &checkpoint_dir.join("generator.pt"),
        &checkpoint_dir.join("discriminator.pt"),
    )?;

    let meta = CheckpointMeta {
        step: state.step,
        epoch: state.epoch,
        d_loss: metrics.latest_d_loss().unwrap_or(0.0),
        g_loss: metrics.latest_g_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        model: serde_json::json!({
            "output_size": model.output_size(),
            "input_c_dim": model.input_c_dim(),
            "output_c_dim": model.output_c_dim(),
        })
        .to_string(),
    };
    let meta_json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(checkpoint_dir.join("meta.json"), meta_json)?;

    metrics.save_csv(&checkpoint_dir.join("metrics.csv").to_string_lossy())?;

    info!("saved checkpoint to {}", checkpoint_dir.display());
    Ok(checkpoint_dir)
}

/// Load checkpoint metadata.
pub fn load_checkpoint_meta(checkpoint_dir: &Path) -> Result<CheckpointMeta> {
    let meta_path = checkpoint_dir.join("meta.json");
    let content = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("failed to read {}", meta_path.display()))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Restore all parameters in place from one checkpoint directory.
///
/// # Returns
///
/// Tuple of (metadata, metric history). The metadata carries the step and
/// epoch to resume from; the metric history carries every recorded step.
pub fn load_checkpoint(
    model: &mut Pix2Pix,
    checkpoint_dir: &Path,
) -> Result<(CheckpointMeta, TrainingMetrics)> {
    model.load(
        &checkpoint_dir.join("generator.pt"),
        &checkpoint_dir.join("discriminator.pt"),
    )?;

    let meta = load_checkpoint_meta(checkpoint_dir)?;

    let metrics_path = checkpoint_dir.join("metrics.csv");
    let metrics = if metrics_path.exists() {
        TrainingMetrics::load_csv(&metrics_path.to_string_lossy())?
    } else {
        TrainingMetrics::new()
    };

    info!(
        "loaded checkpoint from {} (step {})",
        checkpoint_dir.display(),
        meta.step
    );
    Ok((meta, metrics))
}

/// Restore from the most recent checkpoint under `dir`.
///
/// # Returns
///
/// `Ok(Some((metadata, metric history)))` on success, `Ok(None)` when no
/// checkpoint exists (not fatal), `Err` when the latest checkpoint fails
/// to restore.
pub fn load_latest_checkpoint(
    model: &mut Pix2Pix,
    dir: &Path,
) -> Result<Option<(CheckpointMeta, TrainingMetrics)>> {
    match find_latest_checkpoint(dir) {
        Some(checkpoint_dir) => load_checkpoint(model, &checkpoint_dir).map(Some),
        None => Ok(None),
    }
}

/// Find the most recent checkpoint directory under `dir`.
pub fn find_latest_checkpoint(dir: &Path) -> Option<PathBuf> {
    if !dir.exists() {
        return None;
    }

    let mut checkpoints: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().ok().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .collect();

    checkpoints.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    checkpoints.first().map(|e| e.path())
}

/// List all checkpoints under `dir` with their metadata.
pub fn list_checkpoints(dir: &Path) -> Vec<(PathBuf, CheckpointMeta)> {
    if !dir.exists() {
        return vec![];
    }

    std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().ok().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let path = e.path();
            load_checkpoint_meta(&path).ok().map(|meta| (path, meta))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_checkpoint_name_orders_by_step() {
        assert_eq!(checkpoint_name(4), "checkpoint_step_00000004");
        assert!(checkpoint_name(99) < checkpoint_name(100));
        assert!(checkpoint_name(500) < checkpoint_name(2000));
    }

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            step: 40,
            epoch: 2,
            d_loss: 0.5,
            g_loss: 12.0,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            model: "{}".to_string(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta.step, loaded.step);
        assert_eq!(meta.epoch, loaded.epoch);
    }

    #[test]
    fn test_find_latest_in_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(find_latest_checkpoint(&tmp.path().join("nope")).is_none());
    }

    #[test]
    fn test_find_latest_picks_highest_step() {
        let tmp = TempDir::new().unwrap();
        for step in [5, 500, 35] {
            std::fs::create_dir_all(tmp.path().join(checkpoint_name(step))).unwrap();
        }
        std::fs::create_dir_all(tmp.path().join("unrelated")).unwrap();

        let latest = find_latest_checkpoint(tmp.path()).unwrap();
        assert!(latest.ends_with(checkpoint_name(500)));
    }
}
