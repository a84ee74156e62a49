//! Alternating-optimization training loop for pix2pix
//!
//! One iteration per batch: a configurable number of discriminator updates,
//! then generator updates, then a read-only recomputation of all three
//! scalar losses for logging. Sampling and checkpointing are periodic side
//! effects whose failures are reported but never abort training.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tch::Device;
use tracing::{info, warn};

use super::losses::{d_loss_fake, d_loss_real, discriminator_loss, generator_loss};
use super::metrics::TrainingMetrics;
use crate::data::PairedDataset;
use crate::model::{join_pair, split_pair, Pix2Pix};
use crate::sampling;
use crate::utils::checkpoint;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Learning rate shared by both optimizers
    pub lr: f64,
    /// Adam first-moment coefficient
    pub beta1: f64,
    /// Discriminator updates per batch
    pub d_steps: usize,
    /// Generator updates per batch
    pub g_steps: usize,
    /// Paired samples per batch
    pub batch_size: usize,
    /// Weight of the L1 reconstruction term
    pub l1_lambda: f64,
    /// Weight of the L2 reconstruction term
    pub l2_lambda: f64,
    /// Cap on samples consumed per epoch
    pub train_size: usize,
    /// Directory receiving parameter snapshots
    pub checkpoint_dir: PathBuf,
    /// Directory receiving periodic sample outputs
    pub sample_dir: PathBuf,
    /// Directory receiving loss-curve CSVs
    pub log_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            lr: 2e-4,
            beta1: 0.5,
            d_steps: 1,
            g_steps: 1,
            batch_size: 1,
            l1_lambda: 100.0,
            l2_lambda: 0.0,
            train_size: usize::MAX,
            checkpoint_dir: PathBuf::from("checkpoints"),
            sample_dir: PathBuf::from("samples"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Mutable training state, threaded through the orchestrator explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainState {
    /// Monotonically increasing optimization-step counter
    pub step: i64,
    /// Current epoch index
    pub epoch: usize,
}

/// Periodic sampling trigger.
///
/// The cadence is: every 5th step during the warm-up window (step < 40),
/// every 100th step thereafter.
pub fn should_sample(step: i64) -> bool {
    if step < 40 {
        step % 5 == 0
    } else {
        step % 100 == 0
    }
}

/// Periodic checkpoint trigger: every 5th step during warm-up, every 500th
/// thereafter. A final checkpoint is always written when training ends.
pub fn should_checkpoint(step: i64) -> bool {
    if step < 40 {
        step % 5 == 0
    } else {
        step % 500 == 0
    }
}

/// Pix2Pix trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Train the model on the paired dataset.
    ///
    /// Resumes from the latest checkpoint in the checkpoint directory when
    /// one exists; a missing or unreadable checkpoint is reported and
    /// training proceeds from fresh initialization.
    pub fn train(&mut self, model: &mut Pix2Pix, dataset: &PairedDataset) -> Result<&TrainingMetrics> {
        let mut disc_opt = model.disc_optimizer(self.config.lr, self.config.beta1)?;
        let mut gen_opt = model.gen_optimizer(self.config.lr, self.config.beta1)?;

        std::fs::create_dir_all(&self.config.checkpoint_dir)?;
        std::fs::create_dir_all(&self.config.sample_dir)?;
        std::fs::create_dir_all(&self.config.log_dir)?;

        let mut state = TrainState::default();

        match checkpoint::load_latest_checkpoint(model, &self.config.checkpoint_dir) {
            Ok(Some((meta, metrics))) => {
                info!(
                    "resumed from checkpoint at step {} (epoch {})",
                    meta.step, meta.epoch
                );
                state.step = meta.step;
                state.epoch = meta.epoch;
                // Carry the prior loss history so losses.csv and later
                // checkpoints stay continuous across the restart.
                self.metrics = metrics;
            }
            Ok(None) => info!("no checkpoint found, training from fresh initialization"),
            Err(e) => warn!("checkpoint restore failed ({e:#}), training from fresh initialization"),
        }

        let batches_per_epoch = dataset.num_batches(self.config.batch_size, self.config.train_size);
        if batches_per_epoch == 0 {
            bail!(
                "dataset yields no full batch: {} samples, batch_size {}, train_size cap {}",
                dataset.len(),
                self.config.batch_size,
                self.config.train_size
            );
        }

        info!(
            "training for {} epochs, {} batches per epoch",
            self.config.epochs, batches_per_epoch
        );
        let start_time = Instant::now();

        for epoch in state.epoch..self.config.epochs {
            state.epoch = epoch;
            let files = dataset.shuffled_files();

            let pb = ProgressBar::new(batches_per_epoch as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("##-"),
            );

            for idx in 0..batches_per_epoch {
                let batch_files = &files[idx * self.config.batch_size..(idx + 1) * self.config.batch_size];
                let batch = dataset.load_batch(batch_files)?.to_device(self.device);

                let (source, real_target) =
                    split_pair(&batch, model.input_c_dim(), model.output_c_dim());
                let real_pair = join_pair(&source, &real_target);

                // Discriminator phase: the synthesized target is detached so
                // only the discriminator's parameters receive gradients.
                for _ in 0..self.config.d_steps {
                    let fake_target = model.generator.forward_t(&source, true);
                    let fake_pair = join_pair(&source, &fake_target.detach());

                    let (_, real_logits) = model.discriminator.forward_t(&real_pair, true);
                    let (_, fake_logits) = model.discriminator.forward_t(&fake_pair, true);
                    let d_loss = discriminator_loss(&real_logits, &fake_logits);

                    disc_opt.zero_grad();
                    d_loss.backward();
                    disc_opt.step();
                }

                // Generator phase: gradients flow through the discriminator
                // but only the generator's optimizer applies an update.
                for _ in 0..self.config.g_steps {
                    let fake_target = model.generator.forward_t(&source, true);
                    let fake_pair = join_pair(&source, &fake_target);

                    let (_, fake_logits) = model.discriminator.forward_t(&fake_pair, true);
                    let g_loss = generator_loss(
                        &fake_logits,
                        &real_target,
                        &fake_target,
                        self.config.l1_lambda,
                        self.config.l2_lambda,
                    );

                    gen_opt.zero_grad();
                    g_loss.backward();
                    gen_opt.step();
                }

                // Read-only loss recomputation for logging, inference mode.
                let (err_d_real, err_d_fake, err_g) = tch::no_grad(|| {
                    let fake_target = model.generator.translate(&source);
                    let fake_pair = join_pair(&source, &fake_target);
                    let (_, real_logits) = model.discriminator.forward_t(&real_pair, false);
                    let (_, fake_logits) = model.discriminator.forward_t(&fake_pair, false);

                    (
                        d_loss_real(&real_logits).double_value(&[]),
                        d_loss_fake(&fake_logits).double_value(&[]),
                        generator_loss(
                            &fake_logits,
                            &real_target,
                            &fake_target,
                            self.config.l1_lambda,
                            self.config.l2_lambda,
                        )
                        .double_value(&[]),
                    )
                });

                state.step += 1;
                self.metrics.record_step(state.step, err_d_real, err_d_fake, err_g);

                info!(
                    "epoch [{:2}] [{:4}/{:4}] step {} time {:.1}s d_loss {:.8} g_loss {:.8}",
                    epoch,
                    idx,
                    batches_per_epoch,
                    state.step,
                    start_time.elapsed().as_secs_f64(),
                    err_d_real + err_d_fake,
                    err_g
                );
                pb.set_message(format!("D: {:.4}, G: {:.4}", err_d_real + err_d_fake, err_g));
                pb.inc(1);

                // Side effects must not cost us training progress.
                if should_sample(state.step) {
                    if let Err(e) = sampling::sample_model(
                        model,
                        dataset,
                        &self.config.sample_dir,
                        state.epoch,
                        idx,
                        self.config.batch_size,
                        self.config.l1_lambda,
                        self.config.l2_lambda,
                    ) {
                        warn!("sampling failed at step {}: {e:#}", state.step);
                    }
                }
                if should_checkpoint(state.step) {
                    if let Err(e) = checkpoint::save_checkpoint(
                        model,
                        &self.metrics,
                        &state,
                        &self.config.checkpoint_dir,
                    ) {
                        warn!("checkpoint save failed at step {}: {e:#}", state.step);
                    }
                }
            }

            pb.finish_with_message("done");

            if self.metrics.check_mode_collapse(batches_per_epoch) {
                warn!("possible mode collapse detected, consider rebalancing d/g schedules");
            }

            let losses_csv = self.config.log_dir.join("losses.csv");
            if let Err(e) = self.metrics.save_csv(&losses_csv.to_string_lossy()) {
                warn!("failed to write loss curves: {e:#}");
            }
        }

        // Final snapshot regardless of the periodic cadence.
        if let Err(e) =
            checkpoint::save_checkpoint(model, &self.metrics, &state, &self.config.checkpoint_dir)
        {
            warn!("final checkpoint save failed: {e:#}");
        }

        info!(
            "training complete after {} steps in {:.1}s",
            state.step,
            start_time.elapsed().as_secs_f64()
        );

        Ok(&self.metrics)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.d_steps, 1);
        assert_eq!(config.g_steps, 1);
        assert_eq!(config.l1_lambda, 100.0);
        assert_eq!(config.l2_lambda, 0.0);
    }

    #[test]
    fn test_sample_trigger_cadence() {
        let warmup: Vec<i64> = (1..40).filter(|&s| should_sample(s)).collect();
        assert_eq!(warmup, vec![5, 10, 15, 20, 25, 30, 35]);

        assert!(should_sample(100));
        assert!(should_sample(200));
        assert!(!should_sample(45));
        assert!(!should_sample(101));
    }

    #[test]
    fn test_checkpoint_trigger_cadence() {
        assert!(should_checkpoint(5));
        assert!(should_checkpoint(35));
        assert!(!should_checkpoint(100));
        assert!(should_checkpoint(500));
        assert!(should_checkpoint(1000));
    }
}
