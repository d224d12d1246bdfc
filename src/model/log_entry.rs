//! History walk data model

use serde::Deserialize;

use super::{Commit, FileEntry};

/// One commit's change set within a history walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Path filter the walk was started with
    pub path_args: Vec<String>,

    pub commit: Commit,

    pub files: Vec<FileEntry>,

    /// Was the walk following a single file across renames?
    pub single_file: bool,
}

/// History walk options
///
/// Each field maps onto one `git log` flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// Follow a single tracked file across renames
    pub follow: bool,

    /// `--all`
    pub all: bool,

    /// `--merges --first-parent`
    pub merges: bool,

    /// `--no-merges`
    pub no_merges: bool,

    /// `--reverse`
    pub reverse: bool,

    /// `-n<count>`
    pub max_count: Option<u32>,

    /// `--author=<pattern>`
    pub author: Option<String>,

    /// `--grep=<pattern>`
    pub grep: Option<String>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            follow: true,
            all: false,
            merges: false,
            no_merges: false,
            reverse: false,
            max_count: None,
            author: None,
            grep: None,
        }
    }
}

/// Status vocabulary shared by every async result callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Progress,
    Error,
    Killed,
}

impl JobStatus {
    /// Is this the last status a callback will see?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Progress)
    }
}
