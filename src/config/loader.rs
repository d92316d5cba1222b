// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::Result;

/// Load a settings file from a given path.
///
/// This only performs TOML deserialization; directory checks happen when the
/// resulting values are turned into a `WatcherConfig`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields the defaults.
///
/// Used for the implicit default path; an explicitly requested file that
/// doesn't exist should go through [`load_from_path`] and fail.
pub fn load_optional(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(?path, "no settings file; using defaults");
        return Ok(ConfigFile::default());
    }
    load_from_path(path)
}

/// Settings file looked up in the current working directory when `--config`
/// is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Backupwatch.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackupWatchError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_all_sections() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[watch]
filter = "*.txt"
file_event_delay_ms = 50

[backup]
resume_sequence = true
"#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.watch.filter, "*.txt");
        assert_eq!(cfg.watch.file_event_delay_ms, 50);
        assert!(cfg.backup.resume_sequence);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = NamedTempFile::new().unwrap();
        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.watch.filter, "*");
        assert_eq!(cfg.watch.file_event_delay_ms, 200);
        assert!(!cfg.backup.resume_sequence);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[watch]\nidle_loop_delay_ms = 2\n").unwrap();

        assert!(matches!(
            load_from_path(file.path()),
            Err(BackupWatchError::TomlError(_))
        ));
    }

    #[test]
    fn missing_optional_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_optional(dir.path().join("Backupwatch.toml")).unwrap();
        assert_eq!(cfg.watch.file_event_delay_ms, 200);
    }
}
