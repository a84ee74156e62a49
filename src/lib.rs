//! # Pix2Pix for Audio Spectrogram Translation
//!
//! This crate provides a modular implementation of a conditional GAN
//! (pix2pix) that learns to translate source audio spectrograms into
//! target spectrograms from paired training examples.
//!
//! ## Modules
//!
//! - `data`: Directory-backed dataset of paired `.npy` spectrogram tensors
//! - `model`: U-Net generator, patch discriminator and the combined model
//! - `training`: Alternating-optimization training loop and loss functions
//! - `sampling`: Periodic sampling, test evaluation and visualization
//! - `utils`: Configuration and checkpoint utilities

pub mod data;
pub mod model;
pub mod sampling;
pub mod training;
pub mod utils;

pub use data::{numeric_sorted_files, PairedDataset};
pub use model::{
    join_pair, split_pair, Discriminator, DiscriminatorConfig, Generator, GeneratorConfig, Pix2Pix,
};
pub use sampling::{run_test, sample_model, NullWaveformSink, WaveformSink};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{load_latest_checkpoint, save_checkpoint, Config};
