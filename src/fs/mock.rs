// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Paths whose attribute lookup fails (`is_dir` returns an error).
    broken_lookups: HashSet<PathBuf>,
    /// Paths that cannot be opened for reading.
    unreadable: HashSet<PathBuf>,
}

/// In-memory filesystem for tests.
///
/// Clones share state, so a test can keep one handle for assertions while the
/// watcher or writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state
            .entries
            .insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state.lock().unwrap();
        state
            .entries
            .insert(path.clone(), MockEntry::File(content.into()));
        Self::link_into_parent(&mut state.entries, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        Self::ensure_dir_entry(&mut state.entries, path.as_ref());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.entries.remove(path);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(parent) {
                let name = name.to_string_lossy();
                children.retain(|c| *c != name);
            }
        }
    }

    /// Make the attribute lookup for `path` fail from now on.
    pub fn break_lookup(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.broken_lookups.insert(path.as_ref().to_path_buf());
    }

    /// Make `path` unreadable (copies from it fail with permission denied).
    pub fn deny_read(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.unreadable.insert(path.as_ref().to_path_buf());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// Names of the entries directly inside `dir`, sorted.
    pub fn list(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let state = self.state.lock().unwrap();
        match state.entries.get(dir.as_ref()) {
            Some(MockEntry::Dir(children)) => {
                let mut names = children.clone();
                names.sort();
                names
            }
            _ => Vec::new(),
        }
    }

    fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        Self::ensure_dir_entry(entries, parent);
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !entries.contains_key(path) {
            entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(entries, path);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        let state = self.state.lock().unwrap();
        if state.broken_lookups.contains(path) {
            return Err(io::Error::other(format!(
                "attribute lookup failed: {:?}",
                path
            )));
        }
        match state.entries.get(path) {
            Some(MockEntry::Dir(_)) => Ok(true),
            Some(MockEntry::File(_)) => Ok(false),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file or directory: {:?}", path),
            )),
        }
    }

    fn copy_new(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let mut state = self.state.lock().unwrap();

        if state.unreadable.contains(from) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", from),
            ));
        }

        let content = match state.entries.get(from) {
            Some(MockEntry::File(content)) => content.clone(),
            Some(MockEntry::Dir(_)) => {
                return Err(io::Error::other(format!("is a directory: {:?}", from)));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {:?}", from),
                ));
            }
        };

        if state.entries.contains_key(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {:?}", to),
            ));
        }

        let len = content.len() as u64;
        state.entries.insert(to.to_path_buf(), MockEntry::File(content));
        Self::link_into_parent(&mut state.entries, to);
        Ok(len)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
