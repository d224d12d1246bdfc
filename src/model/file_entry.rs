//! Changed-file data model

use std::path::PathBuf;

use super::Rev;

/// Classification of a changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unmerged,
    Broken,
    Untracked,
    Unknown,
}

impl FileStatus {
    /// Map a name-status code character to a status
    ///
    /// Unrecognized characters yield `None`; `X` is git's own "unknown".
    pub fn from_code(code: char) -> Option<Self> {
        let status = match code {
            'A' => FileStatus::Added,
            'M' => FileStatus::Modified,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            'C' => FileStatus::Copied,
            'T' => FileStatus::TypeChanged,
            'U' => FileStatus::Unmerged,
            'B' => FileStatus::Broken,
            'X' => FileStatus::Unknown,
            '?' => FileStatus::Untracked,
            _ => return None,
        };
        Some(status)
    }

    /// Get the status indicator character
    pub fn indicator(&self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Copied => 'C',
            FileStatus::TypeChanged => 'T',
            FileStatus::Unmerged => 'U',
            FileStatus::Broken => 'B',
            FileStatus::Untracked => '?',
            FileStatus::Unknown => 'X',
        }
    }

    /// Does this status carry an old path?
    pub fn has_old_path(&self) -> bool {
        matches!(self, FileStatus::Renamed | FileStatus::Copied)
    }
}

/// Added/deleted line counts of a text change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
}

/// Which list a file entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Working,
    Staged,
}

/// One changed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the repository root
    pub path: String,

    /// Previous path, only for renames and copies
    pub old_path: Option<String>,

    /// `path` joined onto the repository root
    pub absolute_path: PathBuf,

    pub status: FileStatus,

    /// None for binary files or when counts are unavailable
    pub stats: Option<DiffStats>,

    pub kind: FileKind,

    pub left: Rev,

    pub right: Rev,

    /// Commit hash, set for history entries
    pub commit: Option<String>,
}

impl FileEntry {
    /// Get the status indicator character
    pub fn indicator(&self) -> char {
        self.status.indicator()
    }

    /// Is this an untracked working-tree file?
    pub fn is_untracked(&self) -> bool {
        self.status == FileStatus::Untracked
    }

    /// Display path, `old -> new` for renames and copies
    pub fn display_path(&self) -> String {
        match &self.old_path {
            Some(old) => format!("{} -> {}", old, self.path),
            None => self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> FileEntry {
        FileEntry {
            path: "src/lib.rs".to_string(),
            old_path: None,
            absolute_path: PathBuf::from("/repo/src/lib.rs"),
            status: FileStatus::Modified,
            stats: Some(DiffStats {
                additions: 3,
                deletions: 1,
            }),
            kind: FileKind::Working,
            left: Rev::Index,
            right: Rev::Local,
            commit: None,
        }
    }

    #[test]
    fn test_status_codes() {
        for code in ['A', 'M', 'D', 'R', 'C', 'T', 'U', 'B', 'X', '?'] {
            let status = FileStatus::from_code(code).unwrap();
            assert_eq!(status.indicator(), code);
        }
        assert_eq!(FileStatus::from_code('Z'), None);
    }

    #[test]
    fn test_has_old_path() {
        assert!(FileStatus::Renamed.has_old_path());
        assert!(FileStatus::Copied.has_old_path());
        assert!(!FileStatus::Modified.has_old_path());
    }

    #[test]
    fn test_display_path() {
        let entry = sample_entry();
        assert_eq!(entry.display_path(), "src/lib.rs");

        let renamed = FileEntry {
            old_path: Some("src/old.rs".to_string()),
            status: FileStatus::Renamed,
            ..sample_entry()
        };
        assert_eq!(renamed.display_path(), "src/old.rs -> src/lib.rs");
    }
}
