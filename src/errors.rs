// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupWatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source and target directory are the same: {0:?}")]
    SameDirectory(PathBuf),

    #[error("{role} directory does not exist: {path:?}")]
    MissingDirectory { role: &'static str, path: PathBuf },

    #[error("Configuration error: no file name filter given")]
    MissingFilter,

    #[error("Invalid file name filter: {0}")]
    InvalidFilter(#[from] globset::Error),

    #[error("Target directory {target:?} is inside the watched source directory {watched:?}")]
    TargetInsideSource { watched: PathBuf, target: PathBuf },

    #[error("Watcher is already running")]
    AlreadyRunning,

    #[error("File watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BackupWatchError>;
