//! Data models for gitscope
//!
//! This module contains UI-independent data structures describing
//! comparisons, changed files and history steps.

mod commit;
mod entry_log;
mod file_dict;
mod file_entry;
mod log_entry;
mod rev;

pub use commit::Commit;
pub(crate) use entry_log::EntryLog;
pub use entry_log::LogSnapshot;
pub use file_dict::{FileDict, FileTree, compare_paths, sort_entries};
pub use file_entry::{DiffStats, FileEntry, FileKind, FileStatus};
pub use log_entry::{JobStatus, LogEntry, LogOptions};
pub use rev::Rev;
