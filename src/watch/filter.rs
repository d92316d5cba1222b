// src/watch/filter.rs

use std::fmt;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use crate::errors::Result;

/// Compiled file name glob (e.g. `"*.txt"`).
///
/// Matched against the final path component only, never against directories
/// leading up to it, so `"*.txt"` also matches `notes/today.txt`.
#[derive(Clone)]
pub struct NameFilter {
    pattern: String,
    matcher: GlobMatcher,
}

impl fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameFilter")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            // File names are case-insensitive on Windows; follow the platform.
            .case_insensitive(cfg!(windows))
            .build()?
            .compile_matcher();

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the file name of `path` matches.
    ///
    /// Paths without a file name (e.g. `/` or `..`) never match.
    pub fn matches(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.matcher.is_match(Path::new(name)),
            None => false,
        }
    }
}
