//! gitscope - changed-file lists and file history from the git CLI
//!
//! Runs git as a set of cooperating subprocesses: two listings side by
//! side for a diff, two aligned log streams for a history walk, with
//! retries for git's occasional silent empty output and cancellation of
//! superseded walks.
//!
//! This library provides:
//! - [`git`]: command execution, concurrency primitives, parsers and the
//!   [`git::GitSession`] entry point
//! - [`model`]: domain models
//! - [`config`]: session settings
//! - [`logging`]: tracing setup for the binary

pub mod config;
pub mod git;
pub mod logging;
pub mod model;
