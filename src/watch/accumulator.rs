// src/watch/accumulator.rs

//! Deduplicating set of changed paths awaiting backup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::fs::FileSystem;

/// Insertion-ordered set of paths, no duplicates.
#[derive(Debug, Default)]
pub struct PendingSet {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl PendingSet {
    /// Insert `path` unless already present. Returns true if it was added.
    pub fn insert(&mut self, path: &Path) -> bool {
        if self.seen.contains(path) {
            return false;
        }
        self.seen.insert(path.to_path_buf());
        self.order.push(path.to_path_buf());
        true
    }

    /// Remove and return every path, oldest first.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Result of [`ChangeAccumulator::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Newly added to the pending set.
    Added,
    /// Already pending; the set is unchanged.
    AlreadyPending,
    /// Not a backup candidate: a directory, or its attributes couldn't be read.
    Ignored,
}

impl RecordOutcome {
    /// True for paths that are backup candidates, pending or newly added.
    /// Every such notification restarts the debounce window.
    pub fn is_candidate(self) -> bool {
        !matches!(self, RecordOutcome::Ignored)
    }
}

/// Change accumulator shared between notification delivery and flushing.
///
/// The mutex guards only the in-memory set. Attribute lookups happen before
/// it is taken and copies happen after [`drain_all`](Self::drain_all) has
/// released it, so a slow copy never blocks [`record`](Self::record).
#[derive(Debug)]
pub struct ChangeAccumulator {
    pending: Mutex<PendingSet>,
    fs: Arc<dyn FileSystem>,
}

impl ChangeAccumulator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            pending: Mutex::new(PendingSet::default()),
            fs,
        }
    }

    /// Record a changed path.
    ///
    /// Directories and paths whose attributes can't be read are ignored;
    /// lookup failures are logged, never returned.
    pub fn record(&self, path: &Path) -> RecordOutcome {
        match self.fs.is_dir(path) {
            Ok(false) => {}
            Ok(true) => {
                trace!(?path, "ignoring directory change");
                return RecordOutcome::Ignored;
            }
            Err(err) => {
                debug!(?path, error = %err, "attribute lookup failed; not a backup candidate");
                return RecordOutcome::Ignored;
            }
        }

        if self.lock().insert(path) {
            trace!(?path, "recorded pending change");
            RecordOutcome::Added
        } else {
            RecordOutcome::AlreadyPending
        }
    }

    /// Atomically take every pending path in insertion order and leave the
    /// set empty. Paths recorded afterwards start a fresh batch.
    pub fn drain_all(&self) -> Vec<PathBuf> {
        self.lock().take()
    }

    /// Drop every pending path without returning it.
    pub fn clear(&self) -> usize {
        let dropped = self.lock().take().len();
        if dropped > 0 {
            debug!(dropped, "discarded pending changes");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, PendingSet> {
        // The set is valid after any panic mid-operation (each mutation is a
        // single insert or take), so a poisoned lock is still usable.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn setup() -> (MockFileSystem, ChangeAccumulator) {
        let fs = MockFileSystem::new();
        let acc = ChangeAccumulator::new(Arc::new(fs.clone()));
        (fs, acc)
    }

    #[test]
    fn duplicates_are_recorded_once() {
        let (fs, acc) = setup();
        fs.add_file("/src/a.txt", "a");

        assert_eq!(acc.record(Path::new("/src/a.txt")), RecordOutcome::Added);
        assert_eq!(acc.record(Path::new("/src/a.txt")), RecordOutcome::AlreadyPending);
        assert!(acc.record(Path::new("/src/a.txt")).is_candidate());

        assert_eq!(acc.drain_all(), vec![PathBuf::from("/src/a.txt")]);
    }

    #[test]
    fn drain_preserves_insertion_order_and_empties_the_set() {
        let (fs, acc) = setup();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs.add_file(format!("/src/{name}"), name);
        }

        acc.record(Path::new("/src/c.txt"));
        acc.record(Path::new("/src/a.txt"));
        acc.record(Path::new("/src/c.txt"));
        acc.record(Path::new("/src/b.txt"));

        assert_eq!(
            acc.drain_all(),
            vec![
                PathBuf::from("/src/c.txt"),
                PathBuf::from("/src/a.txt"),
                PathBuf::from("/src/b.txt"),
            ]
        );
        assert!(acc.is_empty());
        assert!(acc.drain_all().is_empty());
    }

    #[test]
    fn path_is_accepted_again_after_a_drain() {
        let (fs, acc) = setup();
        fs.add_file("/src/a.txt", "a");

        assert_eq!(acc.record(Path::new("/src/a.txt")), RecordOutcome::Added);
        acc.drain_all();
        assert_eq!(acc.record(Path::new("/src/a.txt")), RecordOutcome::Added);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn directories_are_ignored() {
        let (fs, acc) = setup();
        fs.add_dir("/src/sub");

        assert_eq!(acc.record(Path::new("/src/sub")), RecordOutcome::Ignored);
        assert!(acc.is_empty());
    }

    #[test]
    fn failed_attribute_lookup_skips_the_path() {
        let (fs, acc) = setup();
        fs.add_file("/src/locked.txt", "x");
        fs.break_lookup("/src/locked.txt");

        assert_eq!(acc.record(Path::new("/src/locked.txt")), RecordOutcome::Ignored);
        // Vanished files fail the lookup the same way.
        assert!(!acc.record(Path::new("/src/gone.txt")).is_candidate());
        assert!(acc.is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let (fs, acc) = setup();
        fs.add_file("/src/a.txt", "a");
        fs.add_file("/src/b.txt", "b");
        acc.record(Path::new("/src/a.txt"));
        acc.record(Path::new("/src/b.txt"));

        assert_eq!(acc.clear(), 2);
        assert!(acc.drain_all().is_empty());
    }

    #[test]
    fn concurrent_records_keep_each_path_once() {
        let (fs, acc) = setup();
        for i in 0..16 {
            fs.add_file(format!("/src/f{i}.txt"), "x");
        }
        let acc = Arc::new(acc);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    for i in 0..16 {
                        acc.record(Path::new(&format!("/src/f{i}.txt")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let drained = acc.drain_all();
        assert_eq!(drained.len(), 16);
        let unique: HashSet<_> = drained.iter().collect();
        assert_eq!(unique.len(), 16);
    }
}
