//! Argument building for diff and log invocations

use super::GitError;
use super::constants::{commands, flags};
use super::template::Templates;
use crate::model::{LogOptions, Rev};

/// Revision arguments selecting the diff between `left` and `right`
///
/// | left   | right  | arguments          |
/// |--------|--------|--------------------|
/// | COMMIT | COMMIT | `<a>..<b>`         |
/// | INDEX  | LOCAL  | (none)             |
/// | COMMIT | INDEX  | `--cached <hash>`  |
/// | other  | other  | `<hash>`           |
///
/// Pairs without a commit side (other than INDEX/LOCAL) are rejected
/// before any process is started, LOCAL/LOCAL included.
pub fn diff_rev_args(left: &Rev, right: &Rev) -> Result<Vec<String>, GitError> {
    match (left, right) {
        (Rev::Local, Rev::Local) => Err(GitError::InvalidComparison(
            "cannot compare the working tree with itself".to_string(),
        )),
        (Rev::Commit { hash: a, .. }, Rev::Commit { hash: b, .. }) => Ok(vec![format!("{a}..{b}")]),
        (Rev::Index, Rev::Local) => Ok(Vec::new()),
        (Rev::Commit { hash, .. }, Rev::Index) => {
            Ok(vec![flags::CACHED.to_string(), hash.clone()])
        }
        _ => match left.hash().or_else(|| right.hash()) {
            Some(hash) => Ok(vec![hash.to_string()]),
            None => Err(GitError::InvalidComparison(format!(
                "no commit to compare between {left} and {right}"
            ))),
        },
    }
}

/// Full `git diff` arguments for one listing format
pub fn diff_args(
    left: &Rev,
    right: &Rev,
    format: &str,
    path_args: &[String],
) -> Result<Vec<String>, GitError> {
    let mut args = vec![commands::DIFF.to_string(), format.to_string()];
    args.extend(diff_rev_args(left, right)?);
    push_paths(&mut args, path_args);
    Ok(args)
}

/// How a history walk lists files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// One tracked file, followed across renames along first parents
    SingleFile,
    /// Any path set, merges diffed against all parents
    AllParents,
}

/// Ordering-affecting options shared by both history streams
///
/// Both streams must use exactly these flags, otherwise record *i* of one
/// stream no longer describes the same commit as record *i* of the other.
pub fn log_walk_flags(options: &LogOptions, mode: WalkMode) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    match mode {
        WalkMode::SingleFile => {
            args.push(flags::FOLLOW.to_string());
            args.push(flags::FIRST_PARENT.to_string());
        }
        WalkMode::AllParents => args.extend(flags::ALL_PARENTS.iter().map(|s| s.to_string())),
    }
    if options.all {
        args.push(flags::ALL.to_string());
    }
    if options.merges {
        args.push(flags::MERGES.to_string());
        if mode != WalkMode::SingleFile {
            args.push(flags::FIRST_PARENT.to_string());
        }
    }
    if options.no_merges {
        args.push(flags::NO_MERGES.to_string());
    }
    if options.reverse {
        args.push(flags::REVERSE.to_string());
    }
    if let Some(count) = options.max_count {
        args.push(format!("-n{count}"));
    }
    if let Some(author) = &options.author {
        args.push(format!("--author={author}"));
    }
    if let Some(grep) = &options.grep {
        args.push(format!("--grep={grep}"));
    }
    args
}

/// Arguments of one history stream
///
/// `format` is the pretty format, `listing` either `--name-status` or
/// `--numstat`. Everything else is identical between the two streams.
pub fn log_stream_args(
    options: &LogOptions,
    mode: WalkMode,
    base: Option<&str>,
    path_args: &[String],
    format: &str,
    listing: &str,
) -> Vec<String> {
    let mut args = vec![
        commands::LOG.to_string(),
        format.to_string(),
        listing.to_string(),
        flags::DATE_RAW.to_string(),
    ];
    args.extend(log_walk_flags(options, mode));
    if let Some(base) = base {
        args.push(base.to_string());
    }
    push_paths(&mut args, path_args);
    args
}

/// Arguments for the header/name-status stream
pub fn log_header_args(
    options: &LogOptions,
    mode: WalkMode,
    base: Option<&str>,
    path_args: &[String],
) -> Vec<String> {
    log_stream_args(
        options,
        mode,
        base,
        path_args,
        Templates::log_header(),
        flags::NAME_STATUS,
    )
}

/// Arguments for the numstat stream
pub fn log_numstat_args(
    options: &LogOptions,
    mode: WalkMode,
    base: Option<&str>,
    path_args: &[String],
) -> Vec<String> {
    log_stream_args(
        options,
        mode,
        base,
        path_args,
        Templates::log_numstat(),
        flags::NUMSTAT,
    )
}

/// `show` of one commit against its first parent, name-status only
pub fn merge_show_args(hash: &str, paths: &[String]) -> Vec<String> {
    let mut args = vec![
        commands::SHOW.to_string(),
        flags::EMPTY_FORMAT.to_string(),
        flags::MERGE_PARENTS.to_string(),
        flags::FIRST_PARENT.to_string(),
        flags::NAME_STATUS.to_string(),
        hash.to_string(),
    ];
    push_paths(&mut args, paths);
    args
}

fn push_paths(args: &mut Vec<String>, paths: &[String]) {
    args.push(flags::SEPARATOR.to_string());
    args.extend(paths.iter().cloned());
}
