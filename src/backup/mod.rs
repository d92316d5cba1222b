// src/backup/mod.rs

//! Backup writing.
//!
//! - [`naming`] owns the `NNNN_<name>` naming policy.
//! - [`writer`] copies files into the target directory and owns the sequence
//!   counter.

pub mod naming;
pub mod writer;

pub use naming::{backup_file_name, next_sequence_in, parse_sequence_prefix, SEQUENCE_WIDTH};
pub use writer::{
    BackupCopy, BackupErrorKind, BackupFailure, BackupWriter, BatchReport,
    SequenceCounter,
};
