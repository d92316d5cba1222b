// src/backup/naming.rs

//! Backup file naming: `NNNN_<original-name>`.
//!
//! The prefix is the zero-padded decimal sequence number. Past 9999 it simply
//! grows to five or more digits; it never wraps.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use anyhow::Result;

use crate::fs::FileSystem;

/// Minimum number of digits in the sequence prefix.
pub const SEQUENCE_WIDTH: usize = 4;

/// Separator between the sequence prefix and the original file name.
pub const SEQUENCE_SEPARATOR: char = '_';

/// Name of the backup file for `original` with the given sequence number.
pub fn backup_file_name(sequence: u64, original: &OsStr) -> OsString {
    let mut name = OsString::from(format!(
        "{sequence:0width$}{SEQUENCE_SEPARATOR}",
        width = SEQUENCE_WIDTH
    ));
    name.push(original);
    name
}

/// Parse the sequence number out of a backup file name.
///
/// Returns `None` for names that don't start with at least
/// [`SEQUENCE_WIDTH`] digits followed by the separator.
pub fn parse_sequence_prefix(name: &str) -> Option<u64> {
    let (digits, _rest) = name.split_once(SEQUENCE_SEPARATOR)?;
    if digits.len() < SEQUENCE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// One past the highest sequence prefix found directly inside `dir`, or 0
/// if there is none.
pub fn next_sequence_in(fs: &dyn FileSystem, dir: &Path) -> Result<u64> {
    let highest = fs
        .read_dir(dir)?
        .iter()
        .filter_map(|path| path.file_name()?.to_str().and_then(parse_sequence_prefix))
        .max();

    Ok(highest.map_or(0, |n| n.saturating_add(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn pads_to_four_digits() {
        assert_eq!(backup_file_name(0, OsStr::new("a.txt")), "0000_a.txt");
        assert_eq!(backup_file_name(42, OsStr::new("report.pdf")), "0042_report.pdf");
        assert_eq!(backup_file_name(9999, OsStr::new("a")), "9999_a");
    }

    #[test]
    fn widens_past_9999() {
        assert_eq!(backup_file_name(10_000, OsStr::new("a.txt")), "10000_a.txt");
        assert_eq!(backup_file_name(123_456, OsStr::new("a.txt")), "123456_a.txt");
    }

    #[test]
    fn keeps_underscores_in_the_original_name() {
        assert_eq!(backup_file_name(3, OsStr::new("my_file_v2.txt")), "0003_my_file_v2.txt");
        assert_eq!(parse_sequence_prefix("0003_my_file_v2.txt"), Some(3));
    }

    #[test]
    fn parses_only_well_formed_prefixes() {
        assert_eq!(parse_sequence_prefix("0000_a.txt"), Some(0));
        assert_eq!(parse_sequence_prefix("0017_a.txt"), Some(17));
        assert_eq!(parse_sequence_prefix("12345_a.txt"), Some(12345));
        assert_eq!(parse_sequence_prefix("017_a.txt"), None);
        assert_eq!(parse_sequence_prefix("00a7_a.txt"), None);
        assert_eq!(parse_sequence_prefix("notes.txt"), None);
        assert_eq!(parse_sequence_prefix("_0001.txt"), None);
    }

    #[test]
    fn next_sequence_follows_the_highest_prefix() {
        let fs = MockFileSystem::new();
        fs.add_dir("/backup");
        assert_eq!(next_sequence_in(&fs, Path::new("/backup")).unwrap(), 0);

        fs.add_file("/backup/0000_a.txt", "a");
        fs.add_file("/backup/0007_b.txt", "b");
        fs.add_file("/backup/0003_a.txt", "a");
        fs.add_file("/backup/readme.md", "unrelated");
        assert_eq!(next_sequence_in(&fs, Path::new("/backup")).unwrap(), 8);
    }

    #[test]
    fn next_sequence_fails_for_missing_dir() {
        let fs = MockFileSystem::new();
        assert!(next_sequence_in(&fs, Path::new("/missing")).is_err());
    }
}
