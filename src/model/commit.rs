//! Commit data model

use chrono::{DateTime, FixedOffset, TimeZone};

/// A commit as reported by a history walk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,

    /// Parent hashes, first parent first
    pub parents: Vec<String>,

    /// Author name
    pub author: String,

    /// Author time, seconds since the epoch
    pub author_time: i64,

    /// Author timezone offset as printed by git (e.g. `+0900`)
    pub time_offset: String,

    /// Human relative date (e.g. `3 days ago`)
    pub relative_date: String,

    /// First line of the message
    pub subject: String,
}

impl Commit {
    /// Does this commit have more than one parent?
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Short hash for display
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    /// Timezone offset in seconds east of UTC
    pub fn offset_seconds(&self) -> Option<i32> {
        let offset = self.time_offset.as_str();
        let (sign, digits) = match offset.as_bytes().first()? {
            b'+' => (1, &offset[1..]),
            b'-' => (-1, &offset[1..]),
            _ => return None,
        };
        if digits.len() != 4 {
            return None;
        }
        let hours: i32 = digits[..2].parse().ok()?;
        let minutes: i32 = digits[2..].parse().ok()?;
        Some(sign * (hours * 3600 + minutes * 60))
    }

    /// Author time in the author's own timezone
    pub fn authored_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_seconds()?)?;
        offset.timestamp_opt(self.author_time, 0).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit() -> Commit {
        Commit {
            hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
            parents: vec!["1111111111111111111111111111111111111111".to_string()],
            author: "Alice".to_string(),
            author_time: 1_700_000_000,
            time_offset: "+0900".to_string(),
            relative_date: "2 years ago".to_string(),
            subject: "Initial commit".to_string(),
        }
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(sample_commit().short_hash(), "0123456");
        let short = Commit {
            hash: "abc".to_string(),
            ..sample_commit()
        };
        assert_eq!(short.short_hash(), "abc");
    }

    #[test]
    fn test_is_merge() {
        assert!(!sample_commit().is_merge());
        let merge = Commit {
            parents: vec!["a".to_string(), "b".to_string()],
            ..sample_commit()
        };
        assert!(merge.is_merge());
    }

    #[test]
    fn test_offset_seconds() {
        assert_eq!(sample_commit().offset_seconds(), Some(9 * 3600));
        let west = Commit {
            time_offset: "-0130".to_string(),
            ..sample_commit()
        };
        assert_eq!(west.offset_seconds(), Some(-5400));
        let bad = Commit {
            time_offset: "0900".to_string(),
            ..sample_commit()
        };
        assert_eq!(bad.offset_seconds(), None);
    }

    #[test]
    fn test_authored_at_uses_offset() {
        let at = sample_commit().authored_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.offset().local_minus_utc(), 9 * 3600);
    }
}
