//! gitscope - command-line front end
//!
//! Prints changed-file lists and file history for a repository.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use tokio::sync::mpsc;
use tracing::warn;

use gitscope::config::Settings;
use gitscope::git::{DiffOptions, GitSession, HistoryRequest};
use gitscope::logging;
use gitscope::model::{FileEntry, JobStatus, LogEntry, LogOptions, Rev};

/// Changed files and file history, straight from git
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    repo: PathBuf,

    /// git executable to run
    #[arg(long, global = true, default_value = "git")]
    git: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List files changed between two revisions
    Diff {
        /// Left side: a commit, `index` or `local`
        #[arg(long, default_value = "HEAD")]
        left: Rev,

        /// Right side: a commit, `index` or `local`
        #[arg(long, default_value = "local")]
        right: Rev,

        /// Skip untracked files
        #[arg(long)]
        no_untracked: bool,

        /// Limit the listing to these paths
        paths: Vec<String>,
    },

    /// Show the history of a path
    Log {
        #[command(flatten)]
        options: LogArgs,

        /// Limit the walk to these paths
        paths: Vec<String>,
    },

    /// Check whether a path has any history
    Probe {
        #[command(flatten)]
        options: LogArgs,

        paths: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Stop after this many commits
    #[arg(short = 'n', long)]
    max_count: Option<u32>,

    #[arg(long)]
    author: Option<String>,

    /// Only commits whose message matches
    #[arg(long)]
    grep: Option<String>,

    /// Oldest first
    #[arg(long)]
    reverse: bool,

    /// Walk every ref, not just HEAD
    #[arg(long)]
    all: bool,

    #[arg(long)]
    no_merges: bool,

    /// Do not follow a single file across renames
    #[arg(long)]
    no_follow: bool,

    /// Start from this revision instead of HEAD
    #[arg(long)]
    base: Option<String>,
}

impl LogArgs {
    fn log_options(&self) -> LogOptions {
        LogOptions {
            follow: !self.no_follow,
            all: self.all,
            no_merges: self.no_merges,
            reverse: self.reverse,
            max_count: self.max_count,
            author: self.author.clone(),
            grep: self.grep.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    logging::init()?;

    let cli = Cli::parse();
    let session = GitSession::new(Settings::default().with_git_binary(cli.git.clone()));
    let root = session
        .repository_root(&cli.repo)
        .await
        .wrap_err_with(|| format!("{} is not inside a git repository", cli.repo.display()))?;

    match cli.cmd {
        Cmd::Diff {
            left,
            right,
            no_untracked,
            paths,
        } => {
            let options = DiffOptions {
                show_untracked: no_untracked.then_some(false),
            };
            let dict = session
                .diff_file_list(&root, &left, &right, &paths, &options)
                .await?;
            if !dict.staged.is_empty() {
                println!("Staged:");
                dict.staged.iter().for_each(print_file);
                println!();
            }
            dict.working.iter().for_each(print_file);
        }
        Cmd::Log { options, paths } => {
            let mut request =
                HistoryRequest::new(&root, paths).with_options(options.log_options());
            request.base = options.base.clone();
            run_log(&session, request).await?;
        }
        Cmd::Probe { options, paths } => {
            let found = session
                .file_history_dry_run(&root, &paths, &options.log_options())
                .await;
            if !found {
                return Err(eyre!("no history for {}", paths.join(" ")));
            }
            println!("history found");
        }
    }
    Ok(())
}

async fn run_log(session: &GitSession, request: HistoryRequest) -> color_eyre::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.file_history(request, move |update| {
        let _ = tx.send(update);
    });

    let mut printed = 0;
    while let Some(update) = rx.recv().await {
        for entry in update.entries.iter().skip(printed) {
            print_entry(entry);
        }
        printed = printed.max(update.entries.len());

        match update.status {
            JobStatus::Progress => continue,
            JobStatus::Success => {
                if update.truncated {
                    warn!("history stops at a merge whose files could not be listed");
                }
                return Ok(());
            }
            JobStatus::Error => {
                return Err(update
                    .error
                    .map(Into::into)
                    .unwrap_or_else(|| eyre!("history walk failed")));
            }
            JobStatus::Killed => return Err(eyre!("history walk was cancelled")),
        }
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let commit = &entry.commit;
    let date = commit
        .authored_at()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| commit.relative_date.clone());
    println!(
        "{} {} {} {}",
        commit.short_hash(),
        date,
        commit.author,
        commit.subject
    );
    for file in &entry.files {
        print!("    ");
        print_file(file);
    }
}

fn print_file(file: &FileEntry) {
    match file.stats {
        Some(stats) => println!(
            "{} {} (+{} -{})",
            file.indicator(),
            file.display_path(),
            stats.additions,
            stats.deletions
        ),
        None => println!("{} {}", file.indicator(), file.display_path()),
    }
}
