// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

pub mod mock;

/// Abstract filesystem interface.
///
/// Everything the watcher and the backup writer touch on disk goes through
/// this trait so tests can inject failures that are awkward to provoke on a
/// real filesystem (attribute lookups failing, permission errors).
pub trait FileSystem: Send + Sync + Debug {
    /// Attribute lookup: is `path` a directory?
    ///
    /// Unlike [`Path::is_dir`], failures are reported rather than folded into
    /// `false`, so callers can log them.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;

    /// Copy `from` to `to`, failing with [`io::ErrorKind::AlreadyExists`] if
    /// `to` is already present. Never overwrites.
    fn copy_new(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        fs::metadata(path).map(|meta| meta.is_dir())
    }

    fn copy_new(&self, from: &Path, to: &Path) -> io::Result<u64> {
        // Open the source first so a vanished source never leaves an empty
        // destination behind.
        let mut src = fs::File::open(from)?;
        let permissions = src.metadata()?.permissions();

        let mut dst = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(to)?;

        let result = io::copy(&mut src, &mut dst).and_then(|bytes| {
            dst.set_permissions(permissions)?;
            Ok(bytes)
        });
        drop(dst);
        discard_on_error(to, result)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// Remove a destination we created when the copy into it failed, so a failed
/// backup never leaves a file under its name.
fn discard_on_error(created: &Path, result: io::Result<u64>) -> io::Result<u64> {
    if result.is_err() {
        if let Err(err) = fs::remove_file(created) {
            warn!(path = ?created, error = %err, "failed to remove incomplete backup");
        }
    }
    result
}
