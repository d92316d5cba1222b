// src/watch/debounce.rs

//! Trailing-edge debounce: a restartable one-shot timer.
//!
//! The scheduler is a small actor task holding at most one deadline:
//!
//! - `rearm` replaces the deadline with `now + delay` (latest wins),
//! - `cancel` clears it,
//! - when the deadline passes, the [`FlushHandler`] runs once on the blocking
//!   pool and the actor goes back to idle until rearmed.
//!
//! Because the flush runs outside the actor, the actor keeps accepting
//! `rearm` calls while a flush is still copying files.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, trace};

/// Work performed when the debounce timer fires.
///
/// Called on a blocking-pool thread; implementations may do blocking I/O.
pub trait FlushHandler: Send + Sync + 'static {
    fn flush(&self);
}

impl<F> FlushHandler for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn flush(&self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceCommand {
    Rearm,
    Cancel,
    Shutdown,
}

/// Cheap, cloneable handle for rearming or cancelling a running scheduler.
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    tx: mpsc::UnboundedSender<DebounceCommand>,
}

impl DebounceHandle {
    /// Cancel any pending fire and schedule a new one `delay` from now.
    pub fn rearm(&self) {
        self.send(DebounceCommand::Rearm);
    }

    /// Cancel a pending fire, if any. A flush already running is unaffected.
    pub fn cancel(&self) {
        self.send(DebounceCommand::Cancel);
    }

    fn send(&self, command: DebounceCommand) {
        if self.tx.send(command).is_err() {
            trace!(?command, "debounce loop already finished; ignoring");
        }
    }
}

/// Owner of a running debounce actor.
///
/// The actor stops on [`shutdown`](Self::shutdown), or once every handle
/// (including this owner) has been dropped.
pub struct DebounceScheduler {
    handle: DebounceHandle,
    task: JoinHandle<()>,
    delay: Duration,
}

impl fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl DebounceScheduler {
    /// Spawn the actor on the current Tokio runtime.
    pub fn spawn(delay: Duration, handler: Arc<dyn FlushHandler>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_debounce_loop(delay, handler, rx));
        Self {
            handle: DebounceHandle { tx },
            task,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn handle(&self) -> DebounceHandle {
        self.handle.clone()
    }

    pub fn rearm(&self) {
        self.handle.rearm();
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Stop the actor without firing a pending deadline, then wait for any
    /// flush that is still running. Outstanding handles become no-ops.
    pub async fn shutdown(self) {
        self.handle.send(DebounceCommand::Shutdown);
        if let Err(err) = self.task.await {
            error!(error = %err, "debounce task failed");
        }
    }
}

async fn run_debounce_loop(
    delay: Duration,
    handler: Arc<dyn FlushHandler>,
    mut rx: mpsc::UnboundedReceiver<DebounceCommand>,
) {
    debug!(?delay, "debounce loop started");

    let mut deadline: Option<Instant> = None;
    let mut flushes: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(DebounceCommand::Rearm) => {
                    deadline = Some(Instant::now() + delay);
                }
                Some(DebounceCommand::Cancel) => {
                    if deadline.take().is_some() {
                        debug!("pending flush cancelled");
                    }
                }
                Some(DebounceCommand::Shutdown) | None => break,
            },
            _ = wait_for_deadline(deadline) => {
                deadline = None;
                trace!("debounce window elapsed; flushing");
                let handler = Arc::clone(&handler);
                flushes.spawn_blocking(move || handler.flush());
            }
            Some(result) = flushes.join_next(), if !flushes.is_empty() => {
                log_flush_result(result);
            }
        }
    }

    while let Some(result) = flushes.join_next().await {
        log_flush_result(result);
    }

    debug!("debounce loop finished");
}

/// Resolves at `deadline`, or never when there is none.
async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}

fn log_flush_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        error!(error = %err, "flush panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<AtomicUsize>, Arc<dyn FlushHandler>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = Arc::clone(&count);
        let handler: Arc<dyn FlushHandler> = Arc::new(move || {
            handler_count.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[tokio::test]
    async fn does_not_fire_until_rearmed() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(20), handler);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn burst_of_rearms_fires_once() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(50), handler);

        for _ in 0..5 {
            scheduler.rearm();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Back to idle: no further fire without a new rearm.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn continuous_stream_postpones_the_fire() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(60), handler);

        // Rearm every 20ms for ~200ms: never a 60ms pause.
        for _ in 0..10 {
            scheduler.rearm();
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn separate_bursts_fire_separately() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(30), handler);

        scheduler.rearm();
        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.rearm();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_drops_the_pending_fire() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(40), handler);

        scheduler.rearm();
        scheduler.cancel();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn cloned_handles_share_one_deadline() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(40), handler);
        let a = scheduler.handle();
        let b = scheduler.handle();

        a.rearm();
        tokio::time::sleep(Duration::from_millis(20)).await;
        b.rearm();
        tokio::time::sleep(Duration::from_millis(20)).await;
        a.rearm();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;

        // No-op once the actor is gone.
        b.rearm();
        b.cancel();
    }

    #[tokio::test]
    async fn shutdown_does_not_fire_pending_deadline() {
        let (count, handler) = counting();
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(40), handler);

        scheduler.rearm();
        scheduler.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rearm_while_flush_is_running() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = Arc::clone(&count);
        let handler: Arc<dyn FlushHandler> = Arc::new(move || {
            std::thread::sleep(Duration::from_millis(100));
            handler_count.fetch_add(1, Ordering::SeqCst);
        });
        let scheduler = DebounceScheduler::spawn(Duration::from_millis(20), handler);

        scheduler.rearm();
        // First flush is now sleeping inside the handler.
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.rearm();

        // shutdown waits for both flushes.
        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.shutdown().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
