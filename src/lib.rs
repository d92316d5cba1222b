// src/lib.rs

pub mod backup;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_from_path, load_optional};
use crate::config::model::{ConfigFile, RawWatcherConfig};
use crate::watch::BackupWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings file loading and CLI overrides
/// - the backup watcher
/// - stop triggers (Ctrl-C, or Enter on stdin)
pub async fn run(args: CliArgs) -> Result<()> {
    let file = load_settings(&args)?;
    let raw = apply_overrides(RawWatcherConfig::from_file(&file, &args.source, &args.target), &args);

    let watcher = Arc::new(BackupWatcher::from_raw(raw)?);
    info!(
        next_sequence = watcher.next_sequence(),
        "backup watcher ready; press Enter or Ctrl-C to stop"
    );

    spawn_stop_triggers(Arc::clone(&watcher));

    watcher.start().await?;
    Ok(())
}

fn load_settings(args: &CliArgs) -> Result<ConfigFile> {
    match &args.config {
        Some(path) => load_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => {
            let path = default_config_path();
            load_optional(&path)
                .with_context(|| format!("failed to load settings from {}", path.display()))
        }
    }
}

/// CLI flags win over the settings file.
fn apply_overrides(mut raw: RawWatcherConfig, args: &CliArgs) -> RawWatcherConfig {
    if let Some(filter) = &args.filter {
        raw = raw.with_filter(filter.clone());
    }
    if let Some(ms) = args.delay_ms {
        raw = raw.with_file_event_delay(Duration::from_millis(ms));
    }
    if args.resume {
        raw = raw.with_resume_sequence(true);
    }
    raw
}

/// Stop the watcher on Ctrl-C or on the first line read from stdin.
fn spawn_stop_triggers(watcher: Arc<BackupWatcher>) {
    let line = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    tokio::spawn(stop_on_signal(watcher, tokio::signal::ctrl_c(), line));
}

/// Read `input` on a dedicated thread and resolve once a line arrives.
///
/// Runs on a plain thread, never the runtime's blocking pool: shutting the
/// runtime down must not wait on a pending read.
fn spawn_line_reader<R>(mut input: R) -> oneshot::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("backupwatch-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => debug!("stdin closed"),
                Ok(_) => {
                    debug!("stdin line received");
                    let _ = tx.send(());
                }
                Err(e) => warn!(error = %e, "failed to read stdin"),
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn stdin reader; only Ctrl-C stops the watcher");
    }
    rx
}

/// Stop `watcher` when `ctrl_c` resolves or `line` fires, whichever is
/// first. A closed or unreadable stdin leaves Ctrl-C as the only trigger.
async fn stop_on_signal<F>(watcher: Arc<BackupWatcher>, ctrl_c: F, line: oneshot::Receiver<()>)
where
    F: Future<Output = std::io::Result<()>>,
{
    let line = async {
        if line.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(line);

    let ctrl_c_failed = tokio::select! {
        res = ctrl_c => match res {
            Ok(()) => {
                debug!("Ctrl+C received");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                true
            }
        },
        _ = &mut line => false,
    };
    if ctrl_c_failed {
        line.await;
    }
    watcher.stop();
}
