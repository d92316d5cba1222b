// src/watch/mod.rs

//! File watching, change coalescing and debounced flushing.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the source tree.
//! - Filtering change notifications by file name glob.
//! - Accumulating changed paths without duplicates until the debounce window
//!   elapses, then handing the batch to the backup writer.
//!
//! It does **not** know how backups are named; that lives in [`crate::backup`].

pub mod accumulator;
pub mod debounce;
pub mod events;
pub mod filter;
pub mod watcher;

pub use accumulator::{ChangeAccumulator, PendingSet, RecordOutcome};
pub use debounce::{DebounceHandle, DebounceScheduler, FlushHandler};
pub use events::{is_write_event, EventSink};
pub use filter::NameFilter;
pub use watcher::BackupWatcher;
