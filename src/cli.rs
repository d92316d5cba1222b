// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `backupwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backupwatch",
    version,
    about = "Watch a directory tree and keep numbered backups of changed files.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory tree to watch.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory receiving the backups. Must exist and differ from SOURCE.
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Glob matched against changed file names (e.g. "*.txt").
    ///
    /// Overrides `[watch].filter` from the settings file. Default: "*".
    #[arg(long, value_name = "GLOB")]
    pub filter: Option<String>,

    /// Debounce window in milliseconds.
    ///
    /// Overrides `[watch].file_event_delay_ms`. Default: 200.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Path to a settings file (TOML).
    ///
    /// If omitted, `Backupwatch.toml` in the current directory is used when
    /// present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Continue numbering after the highest backup already in TARGET.
    #[arg(long)]
    pub resume: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BACKUPWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
