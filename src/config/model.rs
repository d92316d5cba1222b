// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::watch::filter::NameFilter;

/// Default trailing-edge debounce window.
pub const DEFAULT_FILE_EVENT_DELAY: Duration = Duration::from_millis(200);

/// Default file name filter: every file.
pub const DEFAULT_FILTER: &str = "*";

/// Optional settings file as read from TOML.
///
/// ```toml
/// [watch]
/// filter = "*.txt"
/// file_event_delay_ms = 200
///
/// [backup]
/// resume_sequence = false
/// ```
///
/// All sections are optional and have reasonable defaults. The directories
/// themselves are always given on the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// `[watch]` section.
    #[serde(default)]
    pub watch: WatchSection,

    /// `[backup]` section.
    #[serde(default)]
    pub backup: BackupSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Glob matched against changed file names (not paths).
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Debounce window in milliseconds.
    #[serde(default = "default_file_event_delay_ms")]
    pub file_event_delay_ms: u64,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

fn default_file_event_delay_ms() -> u64 {
    DEFAULT_FILE_EVENT_DELAY.as_millis() as u64
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            file_event_delay_ms: default_file_event_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupSection {
    /// Continue numbering after the highest `NNNN_` prefix already present
    /// in the target directory instead of starting at 0.
    #[serde(default)]
    pub resume_sequence: bool,
}

/// Unvalidated watcher parameters.
///
/// Convert into a [`WatcherConfig`] with `WatcherConfig::try_from`, which is
/// where every construction-time check happens.
#[derive(Debug, Clone)]
pub struct RawWatcherConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub filter: Option<String>,
    pub file_event_delay: Duration,
    pub resume_sequence: bool,
}

impl RawWatcherConfig {
    /// Parameters with every option at its default.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            filter: Some(DEFAULT_FILTER.to_string()),
            file_event_delay: DEFAULT_FILE_EVENT_DELAY,
            resume_sequence: false,
        }
    }

    /// Parameters taken from a settings file.
    pub fn from_file(
        file: &ConfigFile,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            filter: Some(file.watch.filter.clone()),
            file_event_delay: Duration::from_millis(file.watch.file_event_delay_ms),
            resume_sequence: file.backup.resume_sequence,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_file_event_delay(mut self, delay: Duration) -> Self {
        self.file_event_delay = delay;
        self
    }

    pub fn with_resume_sequence(mut self, resume: bool) -> Self {
        self.resume_sequence = resume;
        self
    }
}

/// Validated, immutable watcher configuration.
///
/// Invariants (checked once, in `TryFrom<RawWatcherConfig>`):
/// - source and target both exist and are directories,
/// - source != target, and target is not inside source,
/// - the filter is present and is a valid glob,
/// - the debounce delay is non-zero.
///
/// Both directories are stored canonicalized.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    source: PathBuf,
    target: PathBuf,
    filter: NameFilter,
    file_event_delay: Duration,
    resume_sequence: bool,
}

impl WatcherConfig {
    pub(crate) fn new_unchecked(
        source: PathBuf,
        target: PathBuf,
        filter: NameFilter,
        file_event_delay: Duration,
        resume_sequence: bool,
    ) -> Self {
        Self {
            source,
            target,
            filter,
            file_event_delay,
            resume_sequence,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    pub fn file_event_delay(&self) -> Duration {
        self.file_event_delay
    }

    pub fn resume_sequence(&self) -> bool {
        self.resume_sequence
    }
}
