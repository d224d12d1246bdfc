//! git log format definitions for stable output parsing
//!
//! Both history streams open every record with the same sentinel line so
//! record *i* of one stream lines up with record *i* of the other.

/// Separator used between fields in name-status and numstat lines
pub const FIELD_SEPARATOR: char = '\t';

/// Templates for `git log --pretty=format:`
pub struct Templates;

impl Templates {
    /// Format of the header/name-status stream
    ///
    /// Lines per record:
    /// 1. sentinel
    /// 2. commit hash followed by parent hashes (space separated)
    /// 3. author name
    /// 4. raw author date (`<unixtime> <offset>`, needs `--date=raw`)
    /// 5. relative author date
    /// 6. subject
    ///
    /// Name-status lines follow, after a blank line.
    pub fn log_header() -> &'static str {
        "--pretty=format:%x1e%x1e%n%H %P%n%an%n%ad%n%ar%n%s"
    }

    /// Format of the numstat stream
    ///
    /// Lines per record: sentinel, commit hash; numstat lines follow.
    pub fn log_numstat() -> &'static str {
        "--pretty=format:%x1e%x1e%n%H"
    }
}

/// Number of header lines after the sentinel in the header stream
pub const HEADER_LINES: usize = 5;
