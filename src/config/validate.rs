// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{RawWatcherConfig, WatcherConfig};
use crate::errors::{BackupWatchError, Result};
use crate::watch::filter::NameFilter;

impl TryFrom<RawWatcherConfig> for WatcherConfig {
    type Error = crate::errors::BackupWatchError;

    fn try_from(raw: RawWatcherConfig) -> std::result::Result<Self, Self::Error> {
        let filter = validate_filter(raw.filter.as_deref())?;
        validate_delay(raw.file_event_delay)?;

        // Cheap check first so an obviously wrong invocation is reported as
        // such even when the directory doesn't exist.
        if raw.source == raw.target {
            return Err(BackupWatchError::SameDirectory(raw.source));
        }

        let source = existing_dir("source", &raw.source)?;
        let target = existing_dir("target", &raw.target)?;
        validate_distinct(&source, &target)?;

        Ok(WatcherConfig::new_unchecked(
            source,
            target,
            filter,
            raw.file_event_delay,
            raw.resume_sequence,
        ))
    }
}

fn validate_filter(filter: Option<&str>) -> Result<NameFilter> {
    match filter {
        None => Err(BackupWatchError::MissingFilter),
        Some(pattern) if pattern.trim().is_empty() => Err(BackupWatchError::MissingFilter),
        Some(pattern) => NameFilter::new(pattern),
    }
}

fn validate_delay(delay: Duration) -> Result<()> {
    if delay.is_zero() {
        return Err(BackupWatchError::ConfigError(
            "file_event_delay must be >= 1ms (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Require `path` to be an existing directory and return it canonicalized.
fn existing_dir(role: &'static str, path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(BackupWatchError::MissingDirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(path.canonicalize()?)
}

fn validate_distinct(source: &Path, target: &Path) -> Result<()> {
    if source == target {
        return Err(BackupWatchError::SameDirectory(source.to_path_buf()));
    }
    // Backups written below the watched tree would raise notifications of
    // their own and get backed up again, forever.
    if target.starts_with(source) {
        return Err(BackupWatchError::TargetInsideSource {
            watched: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    Ok(())
}
