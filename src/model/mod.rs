//! Model module containing the GAN architecture components
//!
//! This module provides:
//! - Layer primitives (strided/transposed convolutions, normalization)
//! - U-Net generator mapping source to target spectrograms
//! - Patch discriminator judging (source, target) pairs
//! - Pix2Pix wrapper combining both networks

pub mod ops;

mod discriminator;
mod generator;
mod pix2pix;

pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig, NUM_STAGES, SIZE_MULTIPLE};
pub use pix2pix::{join_pair, split_pair, Pix2Pix};
