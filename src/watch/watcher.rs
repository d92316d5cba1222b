// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::backup::writer::{BackupWriter, BatchReport, SequenceCounter};
use crate::config::model::{RawWatcherConfig, WatcherConfig};
use crate::errors::{BackupWatchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::RunState;
use crate::watch::accumulator::ChangeAccumulator;
use crate::watch::debounce::{DebounceHandle, DebounceScheduler, FlushHandler};
use crate::watch::events::EventSink;

/// Everything that exists only while the watcher is running.
///
/// Dropping a session deregisters the notification source (the
/// `RecommendedWatcher`) and wakes the `start` call waiting on `stopped`.
struct Session {
    notifier: RecommendedWatcher,
    debounce: DebounceHandle,
    active: Arc<AtomicBool>,
    stopped: oneshot::Sender<()>,
}

/// Flush performed when the debounce timer fires: drain the pending set and
/// back up whatever it held.
struct BackupFlush {
    accumulator: Arc<ChangeAccumulator>,
    writer: Arc<Mutex<BackupWriter>>,
    active: Arc<AtomicBool>,
}

impl FlushHandler for BackupFlush {
    fn flush(&self) {
        // Held across drain and copy: a flush that fires while another is
        // copying drains only after it, so batches get numbers in drain order.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.active.load(Ordering::SeqCst) {
            debug!("watcher stopped before flush; nothing to do");
            return;
        }
        flush_pending(&self.accumulator, &mut writer);
    }
}

fn flush_pending(accumulator: &ChangeAccumulator, writer: &mut BackupWriter) -> BatchReport {
    let batch = accumulator.drain_all();
    if batch.is_empty() {
        trace!("flush with empty pending set");
        return BatchReport::default();
    }

    debug!(files = batch.len(), "flushing pending changes");
    writer.copy_all(&batch)
}

/// Watches a source directory tree and backs up changed files into a target
/// directory once changes have settled for the debounce delay.
///
/// Lifecycle: `Stopped -> Running -> Stopped`, repeatable. Share it behind an
/// `Arc` so one task can sit in [`start`](Self::start) while another calls
/// [`stop`](Self::stop).
pub struct BackupWatcher {
    config: WatcherConfig,
    accumulator: Arc<ChangeAccumulator>,
    writer: Arc<Mutex<BackupWriter>>,
    sequence: SequenceCounter,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for BackupWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupWatcher")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BackupWatcher {
    /// Create a watcher operating on the real filesystem.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        Self::with_fs(config, Arc::new(RealFileSystem))
    }

    /// Validate `raw` and create a watcher. All construction errors surface
    /// here, before any watching begins.
    pub fn from_raw(raw: RawWatcherConfig) -> Result<Self> {
        Self::new(WatcherConfig::try_from(raw)?)
    }

    pub fn with_fs(config: WatcherConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let writer = if config.resume_sequence() {
            BackupWriter::resuming(config.target(), Arc::clone(&fs))?
        } else {
            BackupWriter::new(config.target(), Arc::clone(&fs))
        };

        Ok(Self {
            accumulator: Arc::new(ChangeAccumulator::new(fs)),
            sequence: writer.counter(),
            writer: Arc::new(Mutex::new(writer)),
            session: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn source(&self) -> &Path {
        self.config.source()
    }

    pub fn target(&self) -> &Path {
        self.config.target()
    }

    pub fn state(&self) -> RunState {
        if self.lock_session().is_some() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    /// Number of changed files waiting for the debounce timer.
    pub fn pending_len(&self) -> usize {
        self.accumulator.len()
    }

    /// Sequence number the next successful backup will use.
    ///
    /// Never blocks; during a flush it reflects the copies finished so far.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.get()
    }

    /// Start watching and resolve once the watcher has been stopped.
    ///
    /// Registers for write notifications on the source tree (recursively);
    /// the debounce timer is armed lazily by the first matching change.
    /// Returns [`BackupWatchError::AlreadyRunning`] if called while running.
    pub async fn start(&self) -> Result<()> {
        let (stopped_rx, scheduler, consumer) = self.begin()?;

        info!(
            source = ?self.config.source(),
            target = ?self.config.target(),
            filter = %self.config.filter().pattern(),
            delay = ?self.config.file_event_delay(),
            "watching for changes"
        );

        // Resolves when `stop` drops the session, i.e. the sender half.
        let _ = stopped_rx.await;

        // The notifier is gone, so the event channel drains and closes.
        if let Err(err) = consumer.await {
            error!(error = %err, "watcher event loop failed");
        }
        // Lets an in-flight flush finish; a pending deadline is discarded.
        scheduler.shutdown().await;

        info!("watcher stopped");
        Ok(())
    }

    /// Stop watching.
    ///
    /// Deregisters the notification source, discards pending (un-flushed)
    /// changes and cancels the debounce timer. A flush already copying files
    /// completes; no new flush starts once this returns. Calling it while
    /// stopped does nothing.
    pub fn stop(&self) {
        let mut session = self.lock_session();
        let Some(current) = session.take() else {
            debug!("stop requested but watcher is not running");
            return;
        };

        let Session {
            notifier,
            debounce,
            active,
            stopped,
        } = current;

        drop(notifier);
        // Flip before clearing so the event loop can't re-add a path behind
        // the clear, and a timer that fires anyway finds nothing to do.
        active.store(false, Ordering::SeqCst);
        debounce.cancel();
        let dropped = self.accumulator.clear();
        drop(stopped);
        drop(session);

        info!(discarded = dropped, "stop requested");
    }

    /// Register for notifications and spawn the per-session tasks.
    fn begin(
        &self,
    ) -> Result<(
        oneshot::Receiver<()>,
        DebounceScheduler,
        tokio::task::JoinHandle<()>,
    )> {
        let mut session = self.lock_session();
        if session.is_some() {
            return Err(BackupWatchError::AlreadyRunning);
        }

        let active = Arc::new(AtomicBool::new(true));
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
        let notifier = register_notifier(self.config.source(), event_tx)?;

        // Leftovers from a change that raced the previous stop.
        self.accumulator.clear();

        let scheduler = DebounceScheduler::spawn(
            self.config.file_event_delay(),
            Arc::new(BackupFlush {
                accumulator: Arc::clone(&self.accumulator),
                writer: Arc::clone(&self.writer),
                active: Arc::clone(&active),
            }),
        );

        let sink = EventSink::new(
            self.config.filter().clone(),
            Arc::clone(&self.accumulator),
            scheduler.handle(),
            Arc::clone(&active),
        );
        let consumer = tokio::spawn(sink.run(event_rx));

        let (stopped_tx, stopped_rx) = oneshot::channel();
        *session = Some(Session {
            notifier,
            debounce: scheduler.handle(),
            active,
            stopped: stopped_tx,
        });

        Ok((stopped_rx, scheduler, consumer))
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a `notify` watcher on `root` (recursive) that forwards every event
/// into `event_tx`.
fn register_notifier(
    root: &Path,
    event_tx: mpsc::UnboundedSender<Event>,
) -> Result<RecommendedWatcher> {
    let root: PathBuf = root.to_path_buf();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    trace!("event loop gone; dropping notify event");
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    debug!(?root, "registered file watcher");

    Ok(watcher)
}
