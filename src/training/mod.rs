//! Training module for the spectrogram-translation GAN
//!
//! This module provides:
//! - Alternating-optimization training loop
//! - Adversarial and reconstruction loss functions
//! - Per-step metric history

mod losses;
mod metrics;
mod trainer;

pub use losses::{d_loss_fake, d_loss_real, discriminator_loss, generator_loss};
pub use metrics::TrainingMetrics;
pub use trainer::{should_checkpoint, should_sample, TrainState, Trainer, TrainingConfig};
