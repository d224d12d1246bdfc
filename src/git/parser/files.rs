//! name-status / numstat parsers and positional pairing

use std::path::Path;

use super::super::GitError;
use super::super::template::FIELD_SEPARATOR;
use super::{NameStatus, Numstat, Parser, STATUS_CODE_REGEX};
use crate::model::{DiffStats, FileEntry, FileKind, FileStatus, Rev};

/// Fields shared by every entry built from one listing
#[derive(Debug, Clone)]
pub struct EntryContext<'a> {
    pub root: &'a Path,
    pub kind: FileKind,
    pub left: &'a Rev,
    pub right: &'a Rev,
    pub commit: Option<&'a str>,
}

impl EntryContext<'_> {
    fn entry(&self, path: String, old_path: Option<String>, status: FileStatus) -> FileEntry {
        FileEntry {
            absolute_path: self.root.join(&path),
            path,
            old_path,
            status,
            stats: None,
            kind: self.kind,
            left: self.left.clone(),
            right: self.right.clone(),
            commit: self.commit.map(str::to_string),
        }
    }
}

impl Parser {
    /// Parse a single name-status line
    ///
    /// Formats:
    /// - "M<TAB>path"
    /// - "R087<TAB>old<TAB>new" (renames and copies carry a score)
    /// - "MM<TAB>path" (combined diff; the first column is used)
    pub fn parse_name_status_line(line: &str) -> Option<NameStatus> {
        let mut fields = line.split(FIELD_SEPARATOR);
        let code = fields.next()?;
        if !STATUS_CODE_REGEX.is_match(code) {
            return None;
        }
        let status = FileStatus::from_code(code.chars().next()?)?;

        let first = fields.next().filter(|f| !f.is_empty())?;
        let second = fields.next();
        if fields.next().is_some() {
            return None;
        }

        match (status.has_old_path(), second) {
            (true, Some(new)) if !new.is_empty() => Some(NameStatus {
                status,
                path: new.to_string(),
                old_path: Some(first.to_string()),
            }),
            (false, None) => Some(NameStatus {
                status,
                path: first.to_string(),
                old_path: None,
            }),
            _ => None,
        }
    }

    /// Parse a single numstat line
    ///
    /// Non-numeric counts (`-` for binary files) give `stats: None`.
    pub fn parse_numstat_line(line: &str) -> Option<Numstat> {
        let mut fields = line.splitn(3, FIELD_SEPARATOR);
        let additions = fields.next()?;
        let deletions = fields.next()?;
        let path = fields.next()?;

        let stats = match (additions.parse::<u64>(), deletions.parse::<u64>()) {
            (Ok(additions), Ok(deletions)) => Some(DiffStats {
                additions,
                deletions,
            }),
            _ => None,
        };
        Some(Numstat {
            stats,
            path: path.to_string(),
        })
    }

    /// Pair name-status and numstat listings line by line
    ///
    /// Pairing is by position, not by name: both listings come from the
    /// same diff and list files in the same order. Empty lines are ignored.
    /// Differing line counts are a `StreamMismatch`.
    pub fn pair_file_entries<S: AsRef<str>>(
        name_status: &[S],
        numstat: &[S],
        ctx: &EntryContext<'_>,
    ) -> Result<Vec<FileEntry>, GitError> {
        let name_status = non_empty(name_status);
        let numstat = non_empty(numstat);
        if name_status.len() != numstat.len() {
            return Err(GitError::StreamMismatch {
                name_status: name_status.len(),
                numstat: numstat.len(),
            });
        }

        name_status
            .iter()
            .zip(numstat.iter())
            .map(|(ns_line, num_line)| {
                let mut entry = Self::name_status_entry(ns_line, ctx)?;
                entry.stats = Self::parse_numstat_line(num_line).and_then(|n| n.stats);
                Ok(entry)
            })
            .collect()
    }

    /// Like [`Parser::pair_file_entries`], but differing counts leave
    /// every entry without stats instead of failing
    pub fn pair_file_entries_lenient<S: AsRef<str>>(
        name_status: &[S],
        numstat: &[S],
        ctx: &EntryContext<'_>,
    ) -> Result<Vec<FileEntry>, GitError> {
        match Self::pair_file_entries(name_status, numstat, ctx) {
            Err(GitError::StreamMismatch { .. }) => non_empty(name_status)
                .into_iter()
                .map(|line| Self::name_status_entry(line, ctx))
                .collect(),
            other => other,
        }
    }

    /// Entries for `ls-files --others` output
    pub fn untracked_entries<S: AsRef<str>>(lines: &[S], ctx: &EntryContext<'_>) -> Vec<FileEntry> {
        non_empty(lines)
            .into_iter()
            .map(|path| ctx.entry(path.to_string(), None, FileStatus::Untracked))
            .collect()
    }

    fn name_status_entry(line: &str, ctx: &EntryContext<'_>) -> Result<FileEntry, GitError> {
        let parsed = Self::parse_name_status_line(line)
            .ok_or_else(|| GitError::ParseError(format!("Invalid name-status line: {line:?}")))?;
        Ok(ctx.entry(parsed.path, parsed.old_path, parsed.status))
    }
}

fn non_empty<S: AsRef<str>>(lines: &[S]) -> Vec<&str> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|l| !l.is_empty())
        .collect()
}
