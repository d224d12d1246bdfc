//! Runtime settings
//!
//! Loading settings from disk is left to the host application; the record
//! deserializes from any serde format so it can live inside the host's
//! own configuration file.

use serde::Deserialize;

use crate::git::constants::{DEFAULT_MAX_RETRIES, GIT_COMMAND, MERGE_FALLBACK_RETRIES};

/// Settings shared by every request of a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// git binary to run
    pub git_binary: String,

    /// Report untracked files; None asks the repository
    /// (`status.showUntrackedFiles`)
    pub show_untracked: Option<bool>,

    /// Retry passes when the two diff listings disagree
    pub max_retries: usize,

    /// Extra `show` attempts for a merge commit that printed nothing
    pub merge_fallback_retries: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git_binary: GIT_COMMAND.to_string(),
            show_untracked: None,
            max_retries: DEFAULT_MAX_RETRIES,
            merge_fallback_retries: MERGE_FALLBACK_RETRIES,
        }
    }
}

impl Settings {
    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_show_untracked(mut self, show_untracked: Option<bool>) -> Self {
        self.show_untracked = show_untracked;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.git_binary, "git");
        assert_eq!(settings.show_untracked, None);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.merge_fallback_retries, 2);
    }

    #[test]
    fn test_builder_methods() {
        let settings = Settings::default()
            .with_git_binary("/usr/local/bin/git")
            .with_show_untracked(Some(false));
        assert_eq!(settings.git_binary, "/usr/local/bin/git");
        assert_eq!(settings.show_untracked, Some(false));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "show_untracked": true, "max_retries": 5 }"#).unwrap();
        assert_eq!(settings.show_untracked, Some(true));
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.git_binary, "git");
        assert_eq!(settings.merge_fallback_retries, 2);
    }
}
