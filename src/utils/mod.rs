//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling (TOML/JSON)
//! - Step-keyed checkpoint save/load utilities

pub mod checkpoint;
mod config;

pub use checkpoint::{
    find_latest_checkpoint, list_checkpoints, load_checkpoint, load_latest_checkpoint,
    save_checkpoint, CheckpointMeta,
};
pub use config::{ensure_config_exists, Config};
