//! Data module for paired spectrogram tensors
//!
//! This module provides:
//! - Directory-backed dataset of paired `.npy` samples
//! - Shape validation at batch-assembly time
//! - Epoch shuffling and numeric test-set ordering

mod dataset;

pub use dataset::{list_npy_files, numeric_sorted_files, PairedDataset};
