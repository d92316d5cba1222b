// src/logging.rs

//! Output setup for `backupwatch`.
//!
//! Diagnostics go through `tracing` to STDERR. The level is taken from:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BACKUPWATCH_LOG` environment variable, in `EnvFilter` syntax
//!    (e.g. "debug" or "info,backupwatch::watch=trace")
//! 3. default to `info`
//!
//! STDOUT carries exactly one line per backup written (see
//! [`print_backup_line`]), so it can be piped into other tools.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "BACKUPWATCH_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let (filter, rejected) = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(io::stderr)
        .init();

    if let Some(value) = rejected {
        warn!(%value, "ignoring invalid {LOG_ENV}; using info");
    }
    Ok(())
}

/// Filter for the given CLI level and environment value. The second element
/// is the environment value when it could not be parsed.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> (EnvFilter, Option<String>) {
    if let Some(lvl) = cli_level {
        return (EnvFilter::new(directive_for(lvl)), None);
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new("info"), Some(value.to_string())),
        },
        None => (EnvFilter::new("info"), None),
    }
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// The STDOUT line announcing one backup.
pub fn backup_line(source: &Path, destination: &Path) -> String {
    format!(
        "[backupwatch] {} -> {}",
        source.display(),
        destination.display()
    )
}

/// Write [`backup_line`] to STDOUT.
///
/// A closed or broken STDOUT only loses the line; it never fails the copy.
pub fn print_backup_line(source: &Path, destination: &Path) {
    let mut out = io::stdout().lock();
    if let Err(err) = writeln!(out, "{}", backup_line(source, destination)) {
        debug!(error = %err, "could not write backup line to stdout");
    }
}
