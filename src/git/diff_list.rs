//! Changed-file listing between two revisions
//!
//! Up to three branches run at once, joined by a latch:
//! - tracked: `diff --name-status` and `diff --numstat`, paired by position
//! - untracked: `ls-files --others`, when an endpoint is the working tree
//! - staged: the tracked procedure for HEAD vs INDEX, for INDEX vs LOCAL

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument, warn};

use super::args::{diff_args, diff_rev_args};
use super::constants::flags;
use super::parser::{EntryContext, Parser};
use super::retry::ensure_output;
use super::session::GitContext;
use super::sync::{CountDownLatch, join_jobs};
use super::{DiffListErrors, GitError, Job};
use crate::model::{FileDict, FileEntry, FileKind, JobStatus, Rev};

/// Options of one diff listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Overrides the session setting; None falls back to it
    pub show_untracked: Option<bool>,
}

#[derive(Default)]
struct Collected {
    working: Vec<FileEntry>,
    untracked: Vec<FileEntry>,
    staged: Vec<FileEntry>,
    errors: Vec<GitError>,
}

/// Builds a [`FileDict`] for one comparison
pub(crate) struct DiffListBuilder {
    ctx: Arc<GitContext>,
    root: PathBuf,
}

impl DiffListBuilder {
    pub(crate) fn new(ctx: Arc<GitContext>, root: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            root: root.into(),
        }
    }

    #[instrument(level = "debug", skip_all, fields(root = %self.root.display(), left = %left, right = %right))]
    pub(crate) async fn build(
        &self,
        left: &Rev,
        right: &Rev,
        path_args: &[String],
        options: &DiffOptions,
    ) -> Result<FileDict, DiffListErrors> {
        // Invalid pairs fail before any process starts
        diff_rev_args(left, right).map_err(|e| DiffListErrors(vec![e]))?;

        let show_untracked = options.show_untracked.or(self.ctx.settings.show_untracked);
        let list_untracked =
            (left.is_local() || right.is_local()) && show_untracked != Some(false);
        let list_staged = left.is_index() && right.is_local();
        let branches = 1 + usize::from(list_untracked) + usize::from(list_staged);

        let latch = CountDownLatch::new(branches);
        let collected = Arc::new(Mutex::new(Collected::default()));
        let paths = path_args.to_vec();

        self.spawn_branch(&latch, &collected, {
            let (ctx, root) = (self.ctx.clone(), self.root.clone());
            let (left, right, paths) = (left.clone(), right.clone(), paths.clone());
            async move {
                let entries = tracked(&ctx, &root, &left, &right, FileKind::Working, &paths).await;
                Branch::Working(entries)
            }
        });

        if list_untracked {
            self.spawn_branch(&latch, &collected, {
                let (ctx, root) = (self.ctx.clone(), self.root.clone());
                let (left, right, paths) = (left.clone(), right.clone(), paths.clone());
                async move {
                    let entries =
                        untracked(&ctx, &root, &left, &right, &paths, show_untracked).await;
                    Branch::Untracked(entries)
                }
            });
        }

        if list_staged {
            self.spawn_branch(&latch, &collected, {
                let (ctx, root) = (self.ctx.clone(), self.root.clone());
                async move {
                    let entries =
                        tracked(&ctx, &root, &Rev::head(), &Rev::Index, FileKind::Staged, &paths)
                            .await;
                    Branch::Staged(entries)
                }
            });
        }

        latch.wait().await;

        let collected = std::mem::take(
            &mut *collected
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        if !collected.errors.is_empty() {
            warn!(errors = collected.errors.len(), "diff listing failed");
            return Err(DiffListErrors(collected.errors));
        }

        let mut dict = FileDict {
            working: collected.working,
            staged: collected.staged,
            ..Default::default()
        };
        dict.working.extend(collected.untracked);
        dict.finalize();
        debug!(
            working = dict.working.len(),
            staged = dict.staged.len(),
            "diff listing complete"
        );
        Ok(dict)
    }

    fn spawn_branch<F>(&self, latch: &CountDownLatch, collected: &Arc<Mutex<Collected>>, branch: F)
    where
        F: Future<Output = Branch> + Send + 'static,
    {
        let latch = latch.clone();
        let collected = Arc::clone(collected);
        tokio::spawn(async move {
            // Count down even if the branch panics
            let _done = scopeguard::guard((), |_| latch.count_down());
            let result = branch.await;
            let mut guard = collected
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let collected = &mut *guard;
            let (target, entries) = match result {
                Branch::Working(entries) => (&mut collected.working, entries),
                Branch::Untracked(entries) => (&mut collected.untracked, entries),
                Branch::Staged(entries) => (&mut collected.staged, entries),
            };
            match entries {
                Ok(entries) => *target = entries,
                Err(e) => collected.errors.push(e),
            }
        });
    }
}

enum Branch {
    Working(Result<Vec<FileEntry>, GitError>),
    Untracked(Result<Vec<FileEntry>, GitError>),
    Staged(Result<Vec<FileEntry>, GitError>),
}

/// Tracked-file listing: name-status and numstat run side by side
pub(crate) async fn tracked(
    ctx: &GitContext,
    root: &Path,
    left: &Rev,
    right: &Rev,
    kind: FileKind,
    path_args: &[String],
) -> Result<Vec<FileEntry>, GitError> {
    let name_status = ctx.job(root, diff_args(left, right, flags::NAME_STATUS, path_args)?);
    let numstat = ctx.job(root, diff_args(left, right, flags::NUMSTAT, path_args)?);
    let jobs = [name_status.clone(), numstat.clone()];

    join_jobs(&jobs).await;
    check_exits(&jobs)?;

    if name_status.stdout_len() != numstat.stdout_len() {
        debug!(
            name_status = name_status.stdout_len(),
            numstat = numstat.stdout_len(),
            "listings disagree, retrying empty ones"
        );
        let status = ensure_output(&jobs, ctx.settings.max_retries).await;
        check_exits(&jobs)?;
        if status == JobStatus::Error
            && let Some(job) = jobs.iter().find(|j| j.is_silently_empty())
        {
            return Err(GitError::SilentEmptyOutput {
                command: job.spec().display(),
                attempts: ctx.settings.max_retries + 1,
            });
        }
    }

    let entry_ctx = EntryContext {
        root,
        kind,
        left,
        right,
        commit: None,
    };
    Parser::pair_file_entries(&name_status.stdout(), &numstat.stdout(), &entry_ctx)
}

/// Untracked-file listing, when enabled
async fn untracked(
    ctx: &GitContext,
    root: &Path,
    left: &Rev,
    right: &Rev,
    path_args: &[String],
    show_untracked: Option<bool>,
) -> Result<Vec<FileEntry>, GitError> {
    let enabled = match show_untracked {
        Some(enabled) => enabled,
        None => ctx.untracked_files_enabled(root).await?,
    };
    if !enabled {
        return Ok(Vec::new());
    }

    let job = ctx
        .run_checked(root, super::session::ls_untracked_args(path_args))
        .await?;
    let entry_ctx = EntryContext {
        root,
        kind: FileKind::Working,
        left,
        right,
        commit: None,
    };
    Ok(Parser::untracked_entries(&job.stdout(), &entry_ctx))
}

fn check_exits(jobs: &[Job]) -> Result<(), GitError> {
    match jobs.iter().find(|j| !j.succeeded()) {
        Some(job) => Err(job.failure()),
        None => Ok(()),
    }
}
