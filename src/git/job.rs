//! Subprocess job handle
//!
//! A [`Job`] wraps one command: it can be started, joined, killed and
//! respawned, and it captures stdout/stderr line by line while forwarding
//! stdout lines to an optional callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::GitError;
use super::executor::{CommandSpec, OutputLine, ProcessBackend};

/// Callback invoked for each stdout line as it is read
pub type LineHandler = Box<dyn FnMut(&str) + Send>;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Pending,
    Running,
    Exited,
    Killed,
}

impl JobPhase {
    pub fn is_done(&self) -> bool {
        matches!(self, JobPhase::Exited | JobPhase::Killed)
    }
}

#[derive(Default)]
struct Captured {
    stdout: Vec<String>,
    stderr: Vec<String>,
    exit_code: Option<i32>,
    spawn_error: Option<String>,
    task: Option<JoinHandle<()>>,
    on_stdout: Option<LineHandler>,
}

struct JobInner {
    id: u64,
    spec: CommandSpec,
    backend: Arc<dyn ProcessBackend>,
    captured: Mutex<Captured>,
    phase: watch::Sender<JobPhase>,
}

/// Handle to one subprocess; clones share the same process
#[derive(Clone)]
pub struct Job {
    inner: Arc<JobInner>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.inner.id)
            .field("command", &self.inner.spec.display())
            .field("phase", &self.phase())
            .finish()
    }
}

impl Job {
    pub fn new(spec: CommandSpec, backend: Arc<dyn ProcessBackend>) -> Self {
        let (phase, _) = watch::channel(JobPhase::Pending);
        Self {
            inner: Arc::new(JobInner {
                id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
                spec,
                backend,
                captured: Mutex::new(Captured::default()),
                phase,
            }),
        }
    }

    /// Register a callback for stdout lines; must be called before `start`
    pub fn on_stdout(&self, handler: impl FnMut(&str) + Send + 'static) {
        self.captured().on_stdout = Some(Box::new(handler));
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.inner.spec
    }

    pub fn phase(&self) -> JobPhase {
        *self.inner.phase.borrow()
    }

    /// Spawn the process; no-op unless the job is still pending
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut captured = self.captured();
        if self.phase() != JobPhase::Pending {
            return;
        }
        self.inner.phase.send_replace(JobPhase::Running);
        debug!(job = self.id(), command = %self.inner.spec.display(), "starting job");

        let job = self.clone();
        captured.task = Some(tokio::spawn(async move { job.drive().await }));
    }

    async fn drive(self) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::clone(&self.inner.backend);
        let spec = self.inner.spec.clone();

        let run = async move { backend.run(&spec, tx).await };
        let pump = async {
            while let Some(line) = rx.recv().await {
                self.record_line(line);
            }
        };
        let (result, ()) = tokio::join!(run, pump);

        let mut captured = self.captured();
        match result {
            Ok(code) => captured.exit_code = Some(code),
            Err(e) => captured.spawn_error = Some(e.to_string()),
        }
        captured.task = None;
        drop(captured);

        // A kill that raced with completion wins
        self.inner.phase.send_if_modified(|phase| {
            if *phase == JobPhase::Running {
                *phase = JobPhase::Exited;
                true
            } else {
                false
            }
        });
        debug!(job = self.id(), exit_code = ?self.exit_code(), "job exited");
    }

    fn record_line(&self, line: OutputLine) {
        let mut captured = self.captured();
        match line {
            OutputLine::Stdout(line) => {
                if let Some(handler) = captured.on_stdout.as_mut() {
                    handler(&line);
                }
                captured.stdout.push(line);
            }
            OutputLine::Stderr(line) => captured.stderr.push(line),
        }
    }

    /// Wait for the job to finish and return its exit code
    ///
    /// Returns `Killed` if the job was killed and the spawn error if the
    /// process never ran.
    pub async fn wait(&self) -> Result<i32, GitError> {
        let mut phase = self.inner.phase.subscribe();
        let done = *phase
            .wait_for(|p| p.is_done())
            .await
            .map_err(|_| GitError::Killed)?;

        if done == JobPhase::Killed {
            return Err(GitError::Killed);
        }
        let captured = self.captured();
        match (&captured.spawn_error, captured.exit_code) {
            (Some(e), _) => Err(GitError::Spawn(e.clone())),
            (None, Some(code)) => Ok(code),
            (None, None) => Err(GitError::Spawn("job exited without status".to_string())),
        }
    }

    /// Start (if needed) and wait
    pub async fn run(&self) -> Result<i32, GitError> {
        self.start();
        self.wait().await
    }

    /// Ask the process to terminate; idempotent
    ///
    /// A killed job never restarts and never calls its line handler again.
    pub fn kill(&self) {
        let mut captured = self.captured();
        let killed = self.inner.phase.send_if_modified(|phase| {
            if phase.is_done() {
                // Already finished or killed, keep the outcome
                false
            } else {
                *phase = JobPhase::Killed;
                true
            }
        });
        if !killed {
            return;
        }
        if let Some(task) = captured.task.take() {
            task.abort();
        }
        captured.on_stdout = None;
        debug!(job = self.id(), "job killed");
    }

    /// A new pending job running the identical command
    pub fn respawn(&self) -> Job {
        Job::new(self.inner.spec.clone(), Arc::clone(&self.inner.backend))
    }

    /// Replace this job's captured output and exit code with `other`'s
    pub fn splice_from(&self, other: &Job) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let (stdout, stderr, exit_code, spawn_error) = {
            let theirs = other.captured();
            (
                theirs.stdout.clone(),
                theirs.stderr.clone(),
                theirs.exit_code,
                theirs.spawn_error.clone(),
            )
        };
        let mut ours = self.captured();
        ours.stdout = stdout;
        ours.stderr = stderr;
        ours.exit_code = exit_code;
        ours.spawn_error = spawn_error;
    }

    pub fn stdout(&self) -> Vec<String> {
        self.captured().stdout.clone()
    }

    pub fn stderr(&self) -> Vec<String> {
        self.captured().stderr.clone()
    }

    pub fn stdout_len(&self) -> usize {
        self.captured().stdout.len()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.captured().exit_code
    }

    /// Exited with status 0
    pub fn succeeded(&self) -> bool {
        self.phase() == JobPhase::Exited && self.exit_code() == Some(0)
    }

    /// Exited successfully yet printed nothing on stdout
    pub fn is_silently_empty(&self) -> bool {
        self.succeeded() && self.stdout_len() == 0
    }

    /// Error describing a failed exit, with captured stderr
    pub fn failure(&self) -> GitError {
        let captured = self.captured();
        if let Some(e) = &captured.spawn_error {
            return GitError::Spawn(e.clone());
        }
        if self.phase() == JobPhase::Killed {
            return GitError::Killed;
        }
        GitError::command_failed(
            &self.inner.spec,
            captured.stderr.join("\n"),
            captured.exit_code.unwrap_or(-1),
        )
    }

    fn captured(&self) -> MutexGuard<'_, Captured> {
        self.inner
            .captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
