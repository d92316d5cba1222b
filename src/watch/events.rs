// src/watch/events.rs

//! Turning raw `notify` events into recorded changes.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::watch::accumulator::ChangeAccumulator;
use crate::watch::debounce::DebounceHandle;
use crate::watch::filter::NameFilter;

/// Returns true for events that mean "file content was written".
///
/// That is creation, data modification, and the target side of a rename
/// (editors that save by writing a temp file and renaming it over the
/// original). Metadata-only changes, accesses and removals are ignored.
pub fn is_write_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => true,
        EventKind::Modify(ModifyKind::Name(mode)) => {
            matches!(mode, RenameMode::To | RenameMode::Both)
        }
        _ => false,
    }
}

/// Paths of `event` that refer to written files.
///
/// For a two-sided rename only the destination counts; the source name no
/// longer exists.
pub fn written_paths(event: &Event) -> &[std::path::PathBuf] {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            &event.paths[event.paths.len() - 1..]
        }
        _ => &event.paths,
    }
}

/// Receives forwarded `notify` events for one watch session and feeds the
/// accumulator and the debounce timer.
#[derive(Debug, Clone)]
pub struct EventSink {
    filter: NameFilter,
    accumulator: Arc<ChangeAccumulator>,
    debounce: DebounceHandle,
    active: Arc<AtomicBool>,
}

impl EventSink {
    pub fn new(
        filter: NameFilter,
        accumulator: Arc<ChangeAccumulator>,
        debounce: DebounceHandle,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            filter,
            accumulator,
            debounce,
            active,
        }
    }

    pub fn handle_event(&self, event: &Event) {
        if !is_write_event(&event.kind) {
            trace!(kind = ?event.kind, "ignoring non-write event");
            return;
        }
        for path in written_paths(event) {
            self.handle_path(path);
        }
    }

    /// Record a single changed path and restart the debounce window if it is
    /// a backup candidate. No-op once the session has been stopped.
    pub fn handle_path(&self, path: &Path) {
        if !self.active.load(Ordering::SeqCst) {
            trace!(?path, "watcher stopped; dropping change");
            return;
        }
        if !self.filter.matches(path) {
            trace!(?path, filter = %self.filter.pattern(), "name does not match filter");
            return;
        }

        let outcome = self.accumulator.record(path);
        if outcome.is_candidate() {
            debug!(?path, ?outcome, "change recorded; rearming debounce timer");
            self.debounce.rearm();
        }
    }

    /// Consume forwarded events until the sending side goes away.
    pub async fn run(self, mut event_rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = event_rx.recv().await {
            trace!(?event, "received notify event");
            self.handle_event(&event);
        }
        debug!("watcher event loop finished");
    }
}
