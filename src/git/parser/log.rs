//! History record parser (git log header + file lines)

use super::super::GitError;
use super::super::template::HEADER_LINES;
use super::{Parser, RAW_DATE_REGEX};
use crate::model::Commit;

/// One commit's raw lines from both history streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Position of the record in the walk, starting at 0
    pub index: usize,

    /// Header lines: hash + parents, author, raw date, relative date, subject
    pub header: Vec<String>,

    pub name_status: Vec<String>,

    pub numstat: Vec<String>,
}

impl Parser {
    /// Parse the header lines of one history record
    ///
    /// Format:
    /// ```text
    /// <hash> [<parent> ...]
    /// <author name>
    /// <unixtime> <offset>
    /// <relative date>
    /// <subject>
    /// ```
    pub fn parse_log_header<S: AsRef<str>>(header: &[S]) -> Result<Commit, GitError> {
        if header.len() < HEADER_LINES {
            return Err(GitError::ParseError(format!(
                "Expected {} header lines, got {}",
                HEADER_LINES,
                header.len()
            )));
        }
        let line = |i: usize| header[i].as_ref();

        let mut ids = line(0).split_whitespace();
        let hash = ids
            .next()
            .ok_or_else(|| GitError::ParseError("Missing commit hash".to_string()))?
            .to_string();
        let parents = ids.map(str::to_string).collect();

        let (author_time, time_offset) = Self::parse_raw_date(line(2))?;

        Ok(Commit {
            hash,
            parents,
            author: line(1).to_string(),
            author_time,
            time_offset,
            relative_date: line(3).to_string(),
            subject: line(4).to_string(),
        })
    }

    /// Parse a `--date=raw` value into seconds and offset
    pub fn parse_raw_date(value: &str) -> Result<(i64, String), GitError> {
        let caps = RAW_DATE_REGEX
            .captures(value.trim())
            .ok_or_else(|| GitError::ParseError(format!("Invalid raw date: {value:?}")))?;
        let seconds = caps[1]
            .parse::<i64>()
            .map_err(|e| GitError::ParseError(format!("Invalid timestamp {value:?}: {e}")))?;
        Ok((seconds, caps[2].to_string()))
    }
}
