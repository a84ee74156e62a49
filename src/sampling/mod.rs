//! Sampling and evaluation module
//!
//! This module provides:
//! - Periodic training-time sampling with amplitude rescaling
//! - Test-directory evaluation with numeric input ordering
//! - Heatmap visualization of spectrogram planes

mod sampler;
mod viz;

pub use sampler::{
    rescale_to_source, run_test, sample_model, NullWaveformSink, WaveformSink,
};
pub use viz::{heatmap_color, specgram_to_image, write_composite};
