//! Comparison endpoint data model

use std::fmt;
use std::str::FromStr;

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rev {
    /// The working tree on disk
    Local,

    /// The index (staging area)
    Index,

    /// A specific commit
    Commit {
        /// Commit hash or any revision expression git accepts
        hash: String,

        /// Does this revision name HEAD?
        is_head: bool,
    },
}

impl Rev {
    /// A commit endpoint that is not HEAD
    pub fn commit(hash: impl Into<String>) -> Self {
        Rev::Commit {
            hash: hash.into(),
            is_head: false,
        }
    }

    /// The HEAD commit
    pub fn head() -> Self {
        Rev::Commit {
            hash: "HEAD".to_string(),
            is_head: true,
        }
    }

    /// Commit hash, present only for commit endpoints
    pub fn hash(&self) -> Option<&str> {
        match self {
            Rev::Commit { hash, .. } => Some(hash),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Rev::Local)
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Rev::Index)
    }

    pub fn is_head(&self) -> bool {
        matches!(self, Rev::Commit { is_head: true, .. })
    }
}

impl fmt::Display for Rev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rev::Local => f.write_str("local"),
            Rev::Index => f.write_str("index"),
            Rev::Commit { hash, .. } => f.write_str(hash),
        }
    }
}

impl FromStr for Rev {
    type Err = String;

    /// Parse `local`/`working`, `index`/`staged`, `HEAD` or a commit-ish
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("empty revision".to_string()),
            "local" | "working" => Ok(Rev::Local),
            "index" | "staged" => Ok(Rev::Index),
            "HEAD" | "@" => Ok(Rev::head()),
            _ => Ok(Rev::commit(s)),
        }
    }
}
