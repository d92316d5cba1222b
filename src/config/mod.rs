// src/config/mod.rs

//! Configuration loading and validation for backupwatch.
//!
//! Responsibilities:
//! - Define the optional TOML settings file and the watcher parameters (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate construction invariants like distinct, existing directories (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_from_path, load_optional};
pub use model::{
    BackupSection, ConfigFile, RawWatcherConfig, WatchSection, WatcherConfig,
    DEFAULT_FILE_EVENT_DELAY, DEFAULT_FILTER,
};
