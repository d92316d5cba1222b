use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;

use backupwatch::config::RawWatcherConfig;
use backupwatch::watch::BackupWatcher;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A pair of fresh temporary directories: one to watch, one for backups.
///
/// Both are removed when the value is dropped.
pub struct Dirs {
    source: TempDir,
    target: TempDir,
}

impl Dirs {
    pub fn new() -> Self {
        Self {
            source: TempDir::new().expect("create source dir"),
            target: TempDir::new().expect("create target dir"),
        }
    }

    pub fn source(&self) -> &Path {
        self.source.path()
    }

    pub fn target(&self) -> &Path {
        self.target.path()
    }

    /// Watcher parameters for these directories with a short delay, so tests
    /// don't wait on the 200ms default.
    pub fn raw_config(&self, delay: Duration) -> RawWatcherConfig {
        RawWatcherConfig::new(self.source(), self.target()).with_file_event_delay(delay)
    }

    /// Write `contents` to `source/<rel>`, creating parent directories.
    pub fn write_source(&self, rel: &str, contents: &str) -> PathBuf {
        write_file(self.source(), rel, contents)
    }

    /// Write `contents` to `target/<rel>`.
    pub fn write_target(&self, rel: &str, contents: &str) -> PathBuf {
        write_file(self.target(), rel, contents)
    }

    /// Sorted file names in the target directory.
    pub fn backups(&self) -> Vec<String> {
        list_names(self.target())
    }
}

impl Default for Dirs {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, contents).expect("write file");
    path
}

/// Sorted names of the entries directly inside `dir`.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Poll `dir` until it holds at least `count` entries or `timeout` elapses.
/// Returns the sorted names seen last.
pub async fn wait_for_file_count(dir: &Path, count: usize, timeout: Duration) -> Vec<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let names = list_names(dir);
        if names.len() >= count || tokio::time::Instant::now() >= deadline {
            return names;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Spawn `watcher.start()` and give the platform watcher a moment to register
/// before the test starts writing files.
pub async fn start_in_background(
    watcher: &Arc<BackupWatcher>,
) -> JoinHandle<backupwatch::errors::Result<()>> {
    let task = {
        let watcher = Arc::clone(watcher);
        tokio::spawn(async move { watcher.start().await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;
    task
}
