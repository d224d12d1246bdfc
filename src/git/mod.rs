//! git command execution layer
//!
//! This module drives git as a set of cooperating subprocesses and parses
//! their output.

mod args;
pub mod constants;
mod diff_list;
mod executor;
mod history;
mod job;
/// Parser module (public for integration testing)
pub mod parser;
mod queue;
mod retry;
mod session;
mod sync;
mod template;

#[cfg(test)]
mod fake;

pub use args::{WalkMode, diff_rev_args, log_header_args, log_numstat_args, merge_show_args};
pub use diff_list::DiffOptions;
pub use executor::{CommandSpec, GitExecutor, OutputLine, ProcessBackend};
pub use history::{HistoryRequest, HistoryUpdate, UpdateHandler, WalkHandle};
pub use job::{Job, JobPhase};
pub use queue::SerialJobQueue;
pub use retry::ensure_output;
pub use session::GitSession;
pub use sync::{CountDownLatch, Permit, Semaphore, join_jobs};

use std::io;
use thiserror::Error;

use constants::errors;

/// Errors that can occur when executing git commands
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("{command} failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: i32,
    },

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("git is not installed or not in PATH")]
    GitNotFound,

    #[error("Invalid comparison: {0}")]
    InvalidComparison(String),

    #[error("{command} printed nothing after {attempts} attempts")]
    SilentEmptyOutput { command: String, attempts: usize },

    #[error("Listings disagree: {name_status} name-status vs {numstat} numstat records")]
    StreamMismatch { name_status: usize, numstat: usize },

    #[error("Job was killed")]
    Killed,

    #[error("Failed to run command: {0}")]
    Spawn(String),
}

impl GitError {
    /// Classify a non-zero exit, recognizing common error patterns
    pub fn command_failed(spec: &CommandSpec, stderr: String, exit_code: i32) -> Self {
        if stderr.to_lowercase().contains(errors::NOT_A_REPO) {
            return GitError::NotARepository;
        }
        GitError::CommandFailed {
            command: spec.display(),
            stderr,
            exit_code,
        }
    }
}

/// Aggregated failures of a multi-branch diff listing
#[derive(Error, Debug)]
#[error("{} listing(s) failed: {}", .0.len(), join_errors(.0))]
pub struct DiffListErrors(pub Vec<GitError>);

fn join_errors(errors: &[GitError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
