//! Session: the entry points of the crate
//!
//! A [`GitSession`] owns the state shared between requests: the serial
//! queue for flake-prone commands and the registry of the active history
//! walk. Hosts create one session and keep it for as long as they talk to
//! git.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument};

use super::args::{WalkMode, diff_rev_args, log_walk_flags};
use super::constants::{commands, flags, special};
use super::diff_list::{self, DiffListBuilder, DiffOptions};
use super::executor::{CommandSpec, GitExecutor, ProcessBackend};
use super::history::{self, HistoryRequest, HistoryUpdate, WalkHandle, WalkShared};
use super::job::Job;
use super::queue::SerialJobQueue;
use super::{DiffListErrors, GitError};
use crate::config::Settings;
use crate::model::{FileDict, FileEntry, FileKind, LogOptions, Rev};

/// Shared plumbing handed to every request
pub(crate) struct GitContext {
    pub(crate) backend: Arc<dyn ProcessBackend>,
    pub(crate) settings: Settings,
    pub(crate) serial: SerialJobQueue,
}

impl GitContext {
    pub(crate) fn new(backend: Arc<dyn ProcessBackend>, settings: Settings) -> Self {
        Self {
            backend,
            settings,
            serial: SerialJobQueue::new(),
        }
    }

    /// A pending git job in `root`
    pub(crate) fn job(&self, root: &Path, args: Vec<String>) -> Job {
        Job::new(
            CommandSpec::git(&self.settings.git_binary, root, args),
            Arc::clone(&self.backend),
        )
    }

    /// Run a git command to completion; non-zero exits are errors
    pub(crate) async fn run_checked(&self, root: &Path, args: Vec<String>) -> Result<Job, GitError> {
        let job = self.job(root, args);
        if job.run().await? != 0 {
            return Err(job.failure());
        }
        Ok(job)
    }

    /// Like [`GitContext::run_checked`], through the serial queue
    pub(crate) async fn run_serial_checked(
        &self,
        root: &Path,
        args: Vec<String>,
    ) -> Result<Job, GitError> {
        let job = self.job(root, args);
        if self.serial.enqueue(&job).await? != 0 {
            return Err(job.failure());
        }
        Ok(job)
    }

    /// First stdout line of a successful command
    async fn first_line(&self, root: &Path, args: Vec<String>) -> Result<String, GitError> {
        let job = self.run_checked(root, args).await?;
        job.stdout()
            .into_iter()
            .next()
            .map(|line| line.trim().to_string())
            .ok_or_else(|| GitError::ParseError("Expected one line of output".to_string()))
    }

    /// Does the repository report untracked files?
    ///
    /// Unset `status.showUntrackedFiles` means yes.
    pub(crate) async fn untracked_files_enabled(&self, root: &Path) -> Result<bool, GitError> {
        let job = self.job(root, to_args(&[
            commands::CONFIG,
            flags::GET,
            special::SHOW_UNTRACKED_KEY,
        ]));
        match job.run().await? {
            0 => Ok(job
                .stdout()
                .first()
                .is_none_or(|value| value.trim() != special::SHOW_UNTRACKED_NO)),
            // `config --get` exits 1 for a missing key
            1 => Ok(true),
            _ => Err(job.failure()),
        }
    }

    /// Is `path` a single existing, tracked, non-directory file?
    pub(crate) async fn is_tracked_file(&self, root: &Path, path: &str) -> Result<bool, GitError> {
        match tokio::fs::metadata(root.join(path)).await {
            Ok(meta) if !meta.is_dir() => {}
            _ => return Ok(false),
        }
        let job = self.job(root, {
            let mut args = to_args(&[commands::LS_FILES, flags::ERROR_UNMATCH, flags::SEPARATOR]);
            args.push(path.to_string());
            args
        });
        Ok(job.run().await? == 0)
    }

    /// How a walk over `path_args` has to run
    ///
    /// A single tracked file is followed across renames along first
    /// parents; anything else walks every parent.
    pub(crate) async fn walk_mode(
        &self,
        root: &Path,
        path_args: &[String],
        options: &LogOptions,
    ) -> Result<WalkMode, GitError> {
        let single_file = options.follow
            && match path_args {
                [path] => self.is_tracked_file(root, path).await?,
                _ => false,
            };
        Ok(if single_file {
            WalkMode::SingleFile
        } else {
            WalkMode::AllParents
        })
    }
}

/// `ls-files` arguments listing untracked, non-ignored files
pub(crate) fn ls_untracked_args(path_args: &[String]) -> Vec<String> {
    let mut args = to_args(&[
        commands::LS_FILES,
        flags::OTHERS,
        flags::EXCLUDE_STANDARD,
        flags::SEPARATOR,
    ]);
    args.extend(path_args.iter().cloned());
    args
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Orchestrates every request against git
pub struct GitSession {
    ctx: Arc<GitContext>,
    active_walk: Mutex<Option<Arc<WalkShared>>>,
}

impl Default for GitSession {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl GitSession {
    /// Create a session that runs real git processes
    pub fn new(settings: Settings) -> Self {
        Self::with_backend(Arc::new(GitExecutor::new()), settings)
    }

    /// Create a session on top of a custom process backend
    pub fn with_backend(backend: Arc<dyn ProcessBackend>, settings: Settings) -> Self {
        Self {
            ctx: Arc::new(GitContext::new(backend, settings)),
            active_walk: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Queue used for commands that must not run concurrently
    pub fn serial_queue(&self) -> &SerialJobQueue {
        &self.ctx.serial
    }

    /// Files changed between `left` and `right`, optionally limited to
    /// `path_args`
    ///
    /// Every failed branch is reported; no partial dict is returned.
    pub async fn diff_file_list(
        &self,
        root: &Path,
        left: &Rev,
        right: &Rev,
        path_args: &[String],
        options: &DiffOptions,
    ) -> Result<FileDict, DiffListErrors> {
        DiffListBuilder::new(Arc::clone(&self.ctx), root)
            .build(left, right, path_args, options)
            .await
    }

    /// Start a history walk, superseding any walk still running
    ///
    /// `on_update` receives a `Progress` update per commit (in walk order)
    /// and then exactly one terminal update. Must be called from within a
    /// tokio runtime.
    pub fn file_history<F>(&self, request: HistoryRequest, on_update: F) -> WalkHandle
    where
        F: FnMut(HistoryUpdate) + Send + 'static,
    {
        self.cancel_history();
        let shared = history::start_walk(Arc::clone(&self.ctx), request, Box::new(on_update));
        // A walk started concurrently loses to this one
        let raced = self.active_walk().replace(Arc::clone(&shared));
        if let Some(previous) = raced {
            previous.kill();
        }
        WalkHandle::new(shared)
    }

    /// Kill the active history walk, if any
    pub fn cancel_history(&self) {
        // The walk's handler runs outside this lock
        let previous = self.active_walk().take();
        if let Some(previous) = previous {
            debug!(walk = previous.id(), "superseding history walk");
            previous.kill();
        }
    }

    /// Cheap probe: would a history walk find at least one commit?
    #[instrument(level = "debug", skip(self, options))]
    pub async fn file_history_dry_run(
        &self,
        root: &Path,
        path_args: &[String],
        options: &LogOptions,
    ) -> bool {
        let options = LogOptions {
            max_count: Some(1),
            reverse: false,
            ..options.clone()
        };
        let mode = match self.ctx.walk_mode(root, path_args, &options).await {
            Ok(mode) => mode,
            Err(e) => {
                debug!(error = %e, "history probe failed");
                return false;
            }
        };
        let mut args = to_args(&[commands::LOG, "--pretty=format:%H"]);
        args.extend(log_walk_flags(&options, mode));
        args.push(flags::SEPARATOR.to_string());
        args.extend(path_args.iter().cloned());

        match self.ctx.run_checked(root, args).await {
            Ok(job) => job.stdout().iter().any(|line| !line.trim().is_empty()),
            Err(e) => {
                debug!(error = %e, "history probe failed");
                false
            }
        }
    }

    /// Hash of HEAD
    pub async fn head_revision(&self, root: &Path) -> Result<String, GitError> {
        self.ctx
            .first_line(
                root,
                to_args(&[commands::REV_PARSE, flags::VERIFY, special::HEAD]),
            )
            .await
    }

    /// Top-level directory of the repository containing `path`
    pub async fn repository_root(&self, path: &Path) -> Result<PathBuf, GitError> {
        self.ctx
            .first_line(path, to_args(&[commands::REV_PARSE, flags::SHOW_TOPLEVEL]))
            .await
            .map(PathBuf::from)
    }

    /// Absolute path of the git directory
    pub async fn git_dir(&self, root: &Path) -> Result<PathBuf, GitError> {
        self.ctx
            .first_line(root, to_args(&[commands::REV_PARSE, flags::ABSOLUTE_GIT_DIR]))
            .await
            .map(PathBuf::from)
    }

    /// Nearest common ancestor of two revisions
    pub async fn merge_base(&self, root: &Path, a: &str, b: &str) -> Result<String, GitError> {
        self.ctx
            .first_line(root, to_args(&[commands::MERGE_BASE, a, b]))
            .await
    }

    /// Status and stats of one file between two revisions
    ///
    /// `Ok(None)` when the file did not change.
    pub async fn file_entry_at(
        &self,
        root: &Path,
        left: &Rev,
        right: &Rev,
        path: &str,
    ) -> Result<Option<FileEntry>, GitError> {
        diff_rev_args(left, right)?;
        let kind = if right.is_index() {
            FileKind::Staged
        } else {
            FileKind::Working
        };
        let entries =
            diff_list::tracked(&self.ctx, root, left, right, kind, &[path.to_string()]).await?;
        Ok(entries.into_iter().next())
    }

    /// Does the repository report untracked files?
    pub async fn untracked_files_enabled(&self, root: &Path) -> Result<bool, GitError> {
        self.ctx.untracked_files_enabled(root).await
    }

    /// Is `path` an existing, tracked, non-directory file?
    pub async fn is_tracked_file(&self, root: &Path, path: &str) -> Result<bool, GitError> {
        self.ctx.is_tracked_file(root, path).await
    }

    /// Does git consider the file binary?
    ///
    /// A file with no text line is binary unless it is empty.
    pub async fn is_binary(&self, root: &Path, path: &str) -> Result<bool, GitError> {
        let mut args = to_args(&[commands::GREP, flags::NO_INDEX]);
        args.extend(flags::TEXT_FILES.iter().map(|s| s.to_string()));
        args.push(flags::SEPARATOR.to_string());
        args.push(path.to_string());

        let job = self.ctx.job(root, args);
        match job.run().await? {
            0 => Ok(false),
            // grep exits 1 when nothing matched
            1 => {
                let meta = tokio::fs::metadata(root.join(path)).await?;
                Ok(meta.len() > 0)
            }
            _ => Err(job.failure()),
        }
    }

    /// Restore `path` to its content at `rev`
    ///
    /// The current content is first written to the object database; the
    /// returned blob id recovers it (`git cat-file -p <id>`). `None` when
    /// the file did not exist on disk.
    #[instrument(level = "info", skip(self))]
    pub async fn restore_file(
        &self,
        root: &Path,
        path: &str,
        rev: &str,
    ) -> Result<Option<String>, GitError> {
        let recovery = if root.join(path).is_file() {
            let mut args = to_args(&[commands::HASH_OBJECT, flags::WRITE, flags::SEPARATOR]);
            args.push(path.to_string());
            let job = self.ctx.run_serial_checked(root, args).await?;
            job.stdout().first().map(|id| id.trim().to_string())
        } else {
            None
        };

        let mut args = to_args(&[commands::CHECKOUT, rev, flags::SEPARATOR]);
        args.push(path.to_string());
        self.ctx.run_serial_checked(root, args).await?;
        debug!(recovery = ?recovery, "file restored");
        Ok(recovery)
    }

    fn active_walk(&self) -> MutexGuard<'_, Option<Arc<WalkShared>>> {
        self.active_walk
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
