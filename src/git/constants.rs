//! git-specific constants
//!
//! Centralized definitions for git subcommand names, flags, and special values.

/// git command binary name
pub const GIT_COMMAND: &str = "git";

/// Retry passes used when two parallel listings disagree
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Extra attempts for the merge-commit `show` fallback
pub const MERGE_FALLBACK_RETRIES: usize = 2;

/// git subcommands
pub mod commands {
    pub const DIFF: &str = "diff";
    pub const LOG: &str = "log";
    pub const SHOW: &str = "show";
    pub const LS_FILES: &str = "ls-files";
    pub const REV_PARSE: &str = "rev-parse";
    pub const MERGE_BASE: &str = "merge-base";
    pub const HASH_OBJECT: &str = "hash-object";
    pub const CHECKOUT: &str = "checkout";
    pub const CONFIG: &str = "config";
    pub const GREP: &str = "grep";
}

/// git command flags
pub mod flags {
    /// Global options prepended to every invocation so output stays parseable
    pub const GLOBAL: [&str; 4] = ["-c", "core.quotepath=false", "-c", "color.ui=never"];
    pub const NAME_STATUS: &str = "--name-status";
    pub const NUMSTAT: &str = "--numstat";
    pub const CACHED: &str = "--cached";
    pub const DATE_RAW: &str = "--date=raw";
    /// Show merges against every parent, combined
    pub const ALL_PARENTS: [&str; 2] = ["-m", "-c"];
    pub const FOLLOW: &str = "--follow";
    pub const FIRST_PARENT: &str = "--first-parent";
    pub const ALL: &str = "--all";
    pub const MERGES: &str = "--merges";
    pub const NO_MERGES: &str = "--no-merges";
    pub const REVERSE: &str = "--reverse";
    pub const MERGE_PARENTS: &str = "-m";
    pub const EMPTY_FORMAT: &str = "--format=";
    pub const OTHERS: &str = "--others";
    pub const EXCLUDE_STANDARD: &str = "--exclude-standard";
    pub const ERROR_UNMATCH: &str = "--error-unmatch";
    pub const SHOW_TOPLEVEL: &str = "--show-toplevel";
    pub const ABSOLUTE_GIT_DIR: &str = "--absolute-git-dir";
    pub const VERIFY: &str = "--verify";
    pub const WRITE: &str = "-w";
    pub const GET: &str = "--get";
    /// `grep` flags listing files that contain at least one text line
    pub const TEXT_FILES: [&str; 4] = ["-I", "--name-only", "-e", "."];
    pub const NO_INDEX: &str = "--no-index";
    pub const SEPARATOR: &str = "--";
}

/// Special git values
pub mod special {
    /// Record separator line emitted before every commit in log streams
    pub const RECORD_SENTINEL: &str = "\u{1e}\u{1e}";

    /// Object id of the empty tree, the left side of a root commit
    pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    pub const HEAD: &str = "HEAD";

    /// Config key controlling untracked-file reporting
    pub const SHOW_UNTRACKED_KEY: &str = "status.showUntrackedFiles";

    /// `status.showUntrackedFiles` value that disables reporting
    pub const SHOW_UNTRACKED_NO: &str = "no";
}

/// Error detection patterns in git output
pub mod errors {
    /// Pattern indicating not a git repository
    pub const NOT_A_REPO: &str = "not a git repository";
}
