// src/backup/writer.rs

//! Sequential backup writer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::backup::naming::{backup_file_name, next_sequence_in};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::logging;

/// Why a single file could not be backed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupErrorKind {
    /// The changed file vanished before it could be copied.
    SourceMissing,
    PermissionDenied,
    /// A file with the computed backup name is already in the target.
    DestinationExists,
    /// The changed path has no file name component.
    NoFileName,
    Other,
}

impl BackupErrorKind {
    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => BackupErrorKind::SourceMissing,
            io::ErrorKind::PermissionDenied => BackupErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => BackupErrorKind::DestinationExists,
            _ => BackupErrorKind::Other,
        }
    }
}

impl fmt::Display for BackupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackupErrorKind::SourceMissing => "source missing",
            BackupErrorKind::PermissionDenied => "permission denied",
            BackupErrorKind::DestinationExists => "destination exists",
            BackupErrorKind::NoFileName => "no file name",
            BackupErrorKind::Other => "io error",
        };
        f.write_str(s)
    }
}

/// A successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCopy {
    pub path: PathBuf,
    pub destination: PathBuf,
    pub sequence: u64,
    pub bytes: u64,
}

/// A failed copy. The sequence number it would have used stays free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFailure {
    pub path: PathBuf,
    pub destination: Option<PathBuf>,
    pub kind: BackupErrorKind,
    pub message: String,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub copied: Vec<BackupCopy>,
    pub failed: Vec<BackupFailure>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty() && self.failed.is_empty()
    }
}

/// Sequence number the next successful copy will use.
///
/// Only [`BackupWriter`] advances it. Clones share the value, so other tasks
/// can read it without waiting for a copy batch to finish.
#[derive(Debug, Clone)]
pub struct SequenceCounter(Arc<AtomicU64>);

impl SequenceCounter {
    fn starting_at(next: u64) -> Self {
        Self(Arc::new(AtomicU64::new(next)))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn advance(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Copies changed files into the target directory as `NNNN_<name>`.
///
/// The sequence counter lives here and nowhere else. It advances by exactly
/// one per successful copy, is never reset, and is not consumed by failures.
/// Copies never overwrite: a name collision is a per-file failure.
#[derive(Debug)]
pub struct BackupWriter {
    target: PathBuf,
    fs: Arc<dyn FileSystem>,
    next_sequence: SequenceCounter,
}

impl BackupWriter {
    /// Writer whose first backup gets sequence number 0.
    pub fn new(target: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self::starting_at(target, fs, 0)
    }

    pub fn starting_at(target: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, next_sequence: u64) -> Self {
        Self {
            target: target.into(),
            fs,
            next_sequence: SequenceCounter::starting_at(next_sequence),
        }
    }

    /// Writer that continues after the highest `NNNN_` prefix already in
    /// `target`.
    pub fn resuming(target: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let target = target.into();
        let next = next_sequence_in(fs.as_ref(), &target)?;
        info!(?target, next_sequence = next, "resuming backup sequence");
        Ok(Self::starting_at(target, fs, next))
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Sequence number the next successful copy will use.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.get()
    }

    /// Shared read-only view of the counter.
    pub fn counter(&self) -> SequenceCounter {
        self.next_sequence.clone()
    }

    /// Back up every path in order. Each file succeeds or fails on its own;
    /// a failure never stops the batch.
    pub fn copy_all(&mut self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for path in paths {
            match self.copy_one(path) {
                Ok(copy) => report.copied.push(copy),
                Err(failure) => report.failed.push(failure),
            }
        }

        debug!(
            copied = report.copied.len(),
            failed = report.failed.len(),
            "backup batch finished"
        );
        report
    }

    /// Back up a single file, logging the outcome.
    pub fn copy_one(&mut self, path: &Path) -> std::result::Result<BackupCopy, BackupFailure> {
        let result = self.try_copy(path);
        match &result {
            Ok(copy) => {
                info!(
                    source = ?copy.path,
                    dest = ?copy.destination,
                    sequence = copy.sequence,
                    bytes = copy.bytes,
                    "backed up"
                );
                logging::print_backup_line(&copy.path, &copy.destination);
            }
            Err(failure) => {
                error!(
                    kind = %failure.kind,
                    error = %failure.message,
                    source = ?failure.path,
                    dest = ?failure.destination,
                    "backup failed"
                );
            }
        }
        result
    }

    fn try_copy(&mut self, path: &Path) -> std::result::Result<BackupCopy, BackupFailure> {
        let Some(name) = path.file_name() else {
            return Err(BackupFailure {
                path: path.to_path_buf(),
                destination: None,
                kind: BackupErrorKind::NoFileName,
                message: format!("{:?} has no file name", path),
            });
        };

        let sequence = self.next_sequence.get();
        let destination = self.target.join(backup_file_name(sequence, name));

        match self.fs.copy_new(path, &destination) {
            Ok(bytes) => {
                self.next_sequence.advance();
                Ok(BackupCopy {
                    path: path.to_path_buf(),
                    destination,
                    sequence,
                    bytes,
                })
            }
            Err(err) => Err(BackupFailure {
                path: path.to_path_buf(),
                destination: Some(destination),
                kind: BackupErrorKind::from_io(&err),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn setup() -> (MockFileSystem, BackupWriter) {
        let fs = MockFileSystem::new();
        fs.add_dir("/src");
        fs.add_dir("/backup");
        let writer = BackupWriter::new("/backup", Arc::new(fs.clone()));
        (fs, writer)
    }

    #[test]
    fn copies_with_increasing_prefixes() {
        let (fs, mut writer) = setup();
        fs.add_file("/src/b.txt", "bee");
        fs.add_file("/src/c.txt", "sea");

        let report = writer.copy_all(&[PathBuf::from("/src/b.txt"), PathBuf::from("/src/c.txt")]);

        assert!(report.failed.is_empty());
        assert_eq!(fs.list("/backup"), vec!["0000_b.txt", "0001_c.txt"]);
        assert_eq!(fs.contents("/backup/0001_c.txt").unwrap(), b"sea");
        assert_eq!(writer.next_sequence(), 2);
        assert_eq!(report.copied[1].sequence, 1);
        assert_eq!(report.copied[1].bytes, 3);
    }

    #[test]
    fn same_file_saved_repeatedly_gets_distinct_names() {
        let (fs, mut writer) = setup();
        fs.add_file("/src/a.txt", "v1");
        writer.copy_all(&[PathBuf::from("/src/a.txt")]);
        fs.add_file("/src/a.txt", "v2");
        writer.copy_all(&[PathBuf::from("/src/a.txt")]);

        assert_eq!(fs.list("/backup"), vec!["0000_a.txt", "0001_a.txt"]);
        assert_eq!(fs.contents("/backup/0000_a.txt").unwrap(), b"v1");
        assert_eq!(fs.contents("/backup/0001_a.txt").unwrap(), b"v2");
    }

    #[test]
    fn files_sharing_a_name_in_different_dirs_do_not_collide() {
        let (fs, mut writer) = setup();
        fs.add_file("/src/one/notes.txt", "1");
        fs.add_file("/src/two/notes.txt", "2");

        let report = writer.copy_all(&[
            PathBuf::from("/src/one/notes.txt"),
            PathBuf::from("/src/two/notes.txt"),
        ]);

        assert_eq!(report.copied.len(), 2);
        assert_eq!(fs.list("/backup"), vec!["0000_notes.txt", "0001_notes.txt"]);
    }

    #[test]
    fn failure_does_not_consume_a_sequence_number_or_stop_the_batch() {
        let (fs, mut writer) = setup();
        fs.add_file("/src/a.txt", "a");
        fs.add_file("/src/c.txt", "c");

        let report = writer.copy_all(&[
            PathBuf::from("/src/a.txt"),
            PathBuf::from("/src/vanished.txt"),
            PathBuf::from("/src/c.txt"),
        ]);

        assert_eq!(report.copied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, BackupErrorKind::SourceMissing);
        assert_eq!(fs.list("/backup"), vec!["0000_a.txt", "0001_c.txt"]);
        assert_eq!(writer.next_sequence(), 2);
    }

    #[test]
    fn permission_errors_are_classified() {
        let (fs, mut writer) = setup();
        fs.add_file("/src/secret.txt", "x");
        fs.deny_read("/src/secret.txt");

        let failure = writer.copy_one(Path::new("/src/secret.txt")).unwrap_err();
        assert_eq!(failure.kind, BackupErrorKind::PermissionDenied);
        assert_eq!(writer.next_sequence(), 0);
    }

    #[test]
    fn never_overwrites_an_existing_backup() {
        let (fs, mut writer) = setup();
        fs.add_file("/backup/0000_a.txt", "original");
        fs.add_file("/src/a.txt", "new");

        let failure = writer.copy_one(Path::new("/src/a.txt")).unwrap_err();

        assert_eq!(failure.kind, BackupErrorKind::DestinationExists);
        assert_eq!(failure.destination.as_deref(), Some(Path::new("/backup/0000_a.txt")));
        assert_eq!(fs.contents("/backup/0000_a.txt").unwrap(), b"original");
        assert_eq!(writer.next_sequence(), 0);
    }

    #[test]
    fn resuming_writer_continues_after_existing_backups() {
        let (fs, _) = setup();
        fs.add_file("/backup/0000_a.txt", "original");
        fs.add_file("/backup/0004_b.txt", "b");
        fs.add_file("/src/a.txt", "new");

        let mut writer = BackupWriter::resuming("/backup", Arc::new(fs.clone())).unwrap();
        assert_eq!(writer.next_sequence(), 5);

        writer.copy_one(Path::new("/src/a.txt")).unwrap();
        assert_eq!(fs.contents("/backup/0005_a.txt").unwrap(), b"new");
    }

    #[test]
    fn counter_view_tracks_successful_copies() {
        let (fs, mut writer) = setup();
        let counter = writer.counter();
        fs.add_file("/src/a.txt", "a");

        writer.copy_all(&[PathBuf::from("/src/a.txt"), PathBuf::from("/src/gone.txt")]);
        assert_eq!(counter.get(), 1);
        assert_eq!(counter.get(), writer.next_sequence());
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let (_fs, mut writer) = setup();
        let failure = writer.copy_one(Path::new("/")).unwrap_err();
        assert_eq!(failure.kind, BackupErrorKind::NoFileName);
        assert!(failure.destination.is_none());
    }
}
