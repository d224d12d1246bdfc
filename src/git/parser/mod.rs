//! git output parser
//!
//! Parses the tabular output of git commands into structured data.
//!
//! Wire formats (tab separated, one record per line):
//! - name-status: `<STATUS><TAB><PATH>` or `<STATUS><TAB><OLD><TAB><NEW>`
//! - numstat: `<ADDED><TAB><DELETED><TAB><PATH>` (`-` for binary files)

mod files;
mod log;
mod stream;

pub use files::EntryContext;
pub use log::RawRecord;
pub use stream::{Stream, StreamAligner};

#[cfg(test)]
mod tests;

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{DiffStats, FileStatus};

/// Regex for the name-status code field
///
/// Examples: `M`, `A`, `R087`, `C100`, `MM` (combined diff of a merge)
static STATUS_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z?][A-Z0-9]*$").expect("Invalid status code regex"));

/// Regex for a `--date=raw` value: `<unixtime> <offset>`
static RAW_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)\s+([+-]\d{4})$").expect("Invalid raw date regex"));

/// One parsed name-status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatus {
    pub status: FileStatus,
    pub path: String,
    pub old_path: Option<String>,
}

/// One parsed numstat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numstat {
    /// None when either count is not a number (binary files show `-`)
    pub stats: Option<DiffStats>,
    pub path: String,
}

/// Parser for git command output
pub struct Parser;
