//! History walks: two aligned log streams turned into `LogEntry` updates
//!
//! A walk runs two `git log` processes with identical ordering flags. The
//! header stream prints the commit header and `--name-status` lines, the
//! numstat stream prints `--numstat` lines. A producer task aligns the
//! streams record by record; the walk task consumes the aligned records in
//! order and reports each new entry.
//!
//! Merge commits get their file list from a dedicated `git show` through
//! the serial queue, because `log` reports merges unreliably.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::args::{WalkMode, log_header_args, log_numstat_args, merge_show_args};
use super::constants::special;
use super::parser::{EntryContext, Parser, RawRecord, Stream, StreamAligner};
use super::session::GitContext;
use super::{GitError, Job};
use crate::model::{
    Commit, EntryLog, FileKind, FileStatus, JobStatus, LogEntry, LogOptions, LogSnapshot, Rev,
};

static NEXT_WALK_ID: AtomicU64 = AtomicU64::new(1);

/// Callback receiving the updates of one walk
pub type UpdateHandler = Box<dyn FnMut(HistoryUpdate) + Send>;

/// What to walk
#[derive(Debug, Clone, Default)]
pub struct HistoryRequest {
    /// Repository root the git commands run in
    pub root: PathBuf,

    /// Path filter; empty walks the whole tree
    pub path_args: Vec<String>,

    pub options: LogOptions,

    /// Revision to start from (HEAD when None)
    pub base: Option<String>,
}

impl HistoryRequest {
    pub fn new(root: impl Into<PathBuf>, path_args: Vec<String>) -> Self {
        Self {
            root: root.into(),
            path_args,
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: LogOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// One callback delivery of a walk
#[derive(Debug)]
pub struct HistoryUpdate {
    pub walk_id: u64,
    pub status: JobStatus,
    /// Every entry produced so far, in walk order
    ///
    /// Snapshots of one walk share their storage. Empty for `Error` and
    /// `Killed`.
    pub entries: LogSnapshot,
    /// The walk stopped early: a merge commit's files could not be listed
    pub truncated: bool,
    pub error: Option<GitError>,
}

impl HistoryUpdate {
    fn new(walk_id: u64, status: JobStatus, entries: LogSnapshot) -> Self {
        Self {
            walk_id,
            status,
            entries,
            truncated: false,
            error: None,
        }
    }
}

#[derive(Default)]
struct DeliveryState {
    /// Set once a terminal update was accepted; nothing follows it
    closed: bool,
    /// A `Killed` update waits for the current delivery to finish
    kill_pending: bool,
}

#[derive(Default)]
struct Registry {
    jobs: Vec<Job>,
    tasks: Vec<JoinHandle<()>>,
    killed: bool,
}

/// State of one walk, shared by its tasks, its handle and the session
pub(crate) struct WalkShared {
    id: u64,
    /// Never held while the handler runs
    state: Mutex<DeliveryState>,
    /// Held while the handler runs; `kill` never waits on it
    handler: Mutex<UpdateHandler>,
    registry: Mutex<Registry>,
}

impl WalkShared {
    fn new(handler: UpdateHandler) -> Self {
        Self {
            id: NEXT_WALK_ID.fetch_add(1, Ordering::Relaxed),
            state: Mutex::new(DeliveryState::default()),
            handler: Mutex::new(handler),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Deliver an update unless the walk already ended; false if dropped
    fn report(&self, update: HistoryUpdate) -> bool {
        {
            let mut handler = self.handler();
            {
                let mut state = self.state();
                if state.closed {
                    return false;
                }
                state.closed = update.status.is_terminal();
            }
            (*handler)(update);
            self.flush_kill(&mut handler);
        }
        self.deliver_pending_kill();
        true
    }

    fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Deliver a pending `Killed` update through a held handler
    fn flush_kill(&self, handler: &mut UpdateHandler) {
        let pending = std::mem::take(&mut self.state().kill_pending);
        if pending {
            handler(HistoryUpdate::new(self.id, JobStatus::Killed, LogSnapshot::empty()));
            info!(walk = self.id, "history walk killed");
        }
    }

    /// Deliver a pending `Killed` update unless someone else is delivering
    ///
    /// Whoever holds the handler checks again after releasing it, so a
    /// pending update is never left behind.
    fn deliver_pending_kill(&self) {
        loop {
            let mut handler = match self.handler.try_lock() {
                Ok(handler) => handler,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            self.flush_kill(&mut handler);
            drop(handler);
            if !self.state().kill_pending {
                return;
            }
        }
    }

    /// Track a job so that supersession can kill it
    ///
    /// A job registered after the walk was killed is killed at once.
    fn register(&self, job: &Job) -> Result<(), GitError> {
        let mut registry = self.registry();
        if registry.killed {
            job.kill();
            return Err(GitError::Killed);
        }
        registry.jobs.push(job.clone());
        Ok(())
    }

    fn register_task(&self, task: JoinHandle<()>) {
        let mut registry = self.registry();
        if registry.killed {
            task.abort();
        } else {
            registry.tasks.push(task);
        }
    }

    /// Kill every job of the walk and clear the registry
    fn release(&self) -> Vec<JoinHandle<()>> {
        let mut registry = self.registry();
        for job in registry.jobs.drain(..) {
            job.kill();
        }
        std::mem::take(&mut registry.tasks)
    }

    /// Supersede the walk: one `Killed` update, then silence
    pub(crate) fn kill(&self) {
        // Close delivery first so no task can report after this point
        let first = {
            let mut state = self.state();
            if state.closed {
                false
            } else {
                state.closed = true;
                state.kill_pending = true;
                true
            }
        };
        self.registry().killed = true;
        for task in self.release() {
            task.abort();
        }
        if first {
            self.deliver_pending_kill();
        }
    }

    fn state(&self) -> MutexGuard<'_, DeliveryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handler(&self) -> MutexGuard<'_, UpdateHandler> {
        self.handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Caller-side handle of a running walk
#[derive(Clone)]
pub struct WalkHandle {
    shared: Arc<WalkShared>,
}

impl std::fmt::Debug for WalkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkHandle")
            .field("id", &self.shared.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl WalkHandle {
    pub(crate) fn new(shared: Arc<WalkShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Has the walk delivered its terminal update?
    pub fn is_finished(&self) -> bool {
        self.shared.is_closed()
    }

    /// Kill the walk; a no-op once it finished
    pub fn cancel(&self) {
        self.shared.kill();
    }
}

/// Register a new walk and spawn its driver task
pub(crate) fn start_walk(
    ctx: Arc<GitContext>,
    request: HistoryRequest,
    handler: UpdateHandler,
) -> Arc<WalkShared> {
    let shared = Arc::new(WalkShared::new(handler));
    let span = info_span!("history_walk", walk = shared.id, root = %request.root.display());
    let task = tokio::spawn({
        let shared = Arc::clone(&shared);
        async move { drive(ctx, shared, request).await }.instrument(span)
    });
    shared.register_task(task);
    shared
}

async fn drive(ctx: Arc<GitContext>, shared: Arc<WalkShared>, request: HistoryRequest) {
    let outcome = walk(&ctx, &shared, &request).await;
    let update = match outcome {
        Ok(WalkEnd::Complete(entries)) => {
            info!(entries = entries.len(), "history walk complete");
            HistoryUpdate::new(shared.id, JobStatus::Success, entries)
        }
        Ok(WalkEnd::Truncated(entries)) => HistoryUpdate {
            truncated: true,
            ..HistoryUpdate::new(shared.id, JobStatus::Success, entries)
        },
        // Only supersession kills a walk; it reports on its own
        Err(GitError::Killed) => return,
        Err(e) => {
            warn!(error = %e, "history walk failed");
            HistoryUpdate {
                error: Some(e),
                ..HistoryUpdate::new(shared.id, JobStatus::Error, LogSnapshot::empty())
            }
        }
    };
    shared.report(update);
    // Stop whatever still runs (the other stream after an error)
    shared.release();
}

enum WalkEnd {
    Complete(LogSnapshot),
    Truncated(LogSnapshot),
}

/// Events flowing from the two streaming jobs to the aligner
enum StreamEvent {
    Line(Stream, String),
    Exited(Stream, Result<(), GitError>),
}

/// What the producer hands the consumer
enum Produced {
    Record(RawRecord),
    Done,
    Failed(GitError),
}

async fn walk(
    ctx: &GitContext,
    shared: &WalkShared,
    request: &HistoryRequest,
) -> Result<WalkEnd, GitError> {
    let root = request.root.as_path();
    let mode = ctx
        .walk_mode(root, &request.path_args, &request.options)
        .await?;
    let single_file = mode == WalkMode::SingleFile;
    let base = request.base.as_deref();
    debug!(?mode, paths = ?request.path_args, "starting history walk");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let streams = [
        (
            Stream::Header,
            ctx.job(root, log_header_args(&request.options, mode, base, &request.path_args)),
        ),
        (
            Stream::Numstat,
            ctx.job(root, log_numstat_args(&request.options, mode, base, &request.path_args)),
        ),
    ];
    for (stream, job) in &streams {
        let tx = event_tx.clone();
        let stream = *stream;
        job.on_stdout(move |line| {
            let _ = tx.send(StreamEvent::Line(stream, line.to_string()));
        });
        shared.register(job)?;
    }
    for (stream, job) in streams {
        job.start();
        let tx = event_tx.clone();
        shared.register_task(tokio::spawn(async move {
            let result = match job.wait().await {
                Ok(0) => Ok(()),
                Ok(_) => Err(job.failure()),
                Err(e) => Err(e),
            };
            let _ = tx.send(StreamEvent::Exited(stream, result));
        }));
    }
    drop(event_tx);

    let (record_tx, mut records) = mpsc::unbounded_channel();
    shared.register_task(tokio::spawn(produce(event_rx, record_tx)));

    let mut consumer = Consumer {
        ctx,
        shared,
        request,
        single_file,
        tracked_paths: request.path_args.clone(),
        entries: EntryLog::new(),
    };
    while let Some(produced) = records.recv().await {
        match produced {
            Produced::Record(raw) => {
                if !consumer.consume(raw).await? {
                    return Ok(WalkEnd::Truncated(consumer.entries.snapshot()));
                }
            }
            Produced::Done => return Ok(WalkEnd::Complete(consumer.entries.snapshot())),
            Produced::Failed(e) => return Err(e),
        }
    }
    // The producer went away without a verdict: the walk was killed
    Err(GitError::Killed)
}

/// Align both streams and forward complete records in order
async fn produce(
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
    records: mpsc::UnboundedSender<Produced>,
) {
    let mut aligner = StreamAligner::new();
    while let Some(event) = events.recv().await {
        let released = match event {
            StreamEvent::Line(stream, line) => aligner.push_line(stream, &line),
            StreamEvent::Exited(stream, Ok(())) => aligner.finish(stream),
            StreamEvent::Exited(_, Err(e)) => Err(e),
        };
        match released {
            Ok(released) => {
                for record in released {
                    if records.send(Produced::Record(record)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = records.send(Produced::Failed(e));
                return;
            }
        }
        if aligner.is_finished() {
            debug!(records = aligner.released(), "history streams ended");
            let _ = records.send(Produced::Done);
            return;
        }
    }
}

struct Consumer<'a> {
    ctx: &'a GitContext,
    shared: &'a WalkShared,
    request: &'a HistoryRequest,
    single_file: bool,
    /// Paths used for merge lookups; follows renames in single-file mode
    tracked_paths: Vec<String>,
    entries: EntryLog,
}

impl Consumer<'_> {
    /// Turn one record into an entry and report it
    ///
    /// Returns false when the walk has to stop early.
    async fn consume(&mut self, raw: RawRecord) -> Result<bool, GitError> {
        let commit = Parser::parse_log_header(&raw.header)?;
        let name_status = if commit.is_merge() {
            match self.merge_files(&commit).await? {
                Some(lines) => lines,
                None => {
                    warn!(
                        commit = %commit.short_hash(),
                        paths = ?self.tracked_paths,
                        "no files for merge commit, history is incomplete"
                    );
                    return Ok(false);
                }
            }
        } else {
            raw.name_status
        };

        let left = match commit.parents.first() {
            Some(parent) => Rev::commit(parent.as_str()),
            None => Rev::commit(special::EMPTY_TREE),
        };
        let right = Rev::commit(commit.hash.as_str());
        let entry_ctx = EntryContext {
            root: &self.request.root,
            kind: FileKind::Working,
            left: &left,
            right: &right,
            commit: Some(commit.hash.as_str()),
        };
        let files = Parser::pair_file_entries_lenient(&name_status, &raw.numstat, &entry_ctx)?;

        if self.single_file
            && let Some(old_path) = files
                .iter()
                .find(|f| f.status == FileStatus::Renamed)
                .and_then(|f| f.old_path.clone())
        {
            debug!(commit = %commit.short_hash(), %old_path, "following rename");
            self.tracked_paths = vec![old_path];
        }

        let appended = self.entries.push(LogEntry {
            path_args: self.request.path_args.clone(),
            commit,
            files,
            single_file: self.single_file,
        });
        if !appended {
            warn!(entries = self.entries.len(), "history log is full, stopping walk");
            return Ok(false);
        }
        let update = HistoryUpdate::new(self.shared.id, JobStatus::Progress, self.entries.snapshot());
        if !self.shared.report(update) {
            return Err(GitError::Killed);
        }
        Ok(true)
    }

    /// Name-status of a merge against its first parent
    ///
    /// Empty output is retried; `None` once every attempt came back empty.
    async fn merge_files(&self, commit: &Commit) -> Result<Option<Vec<String>>, GitError> {
        let attempts = self.ctx.settings.merge_fallback_retries + 1;
        let mut job = self.ctx.job(
            &self.request.root,
            merge_show_args(&commit.hash, &self.tracked_paths),
        );
        for attempt in 1..=attempts {
            if attempt > 1 {
                job = job.respawn();
            }
            self.shared.register(&job)?;
            let code = self.ctx.serial.enqueue(&job).await?;
            if code != 0 {
                if attempt == attempts {
                    return Err(job.failure());
                }
                warn!(attempt, exit_code = code, commit = %commit.short_hash(), "merge lookup failed, retrying");
                continue;
            }
            if job.stdout().iter().any(|line| !line.is_empty()) {
                if attempt > 1 {
                    info!(attempt, commit = %commit.short_hash(), "merge lookup recovered");
                }
                return Ok(Some(job.stdout()));
            }
            info!(attempt, attempts, commit = %commit.short_hash(), "merge lookup printed nothing");
        }
        Ok(None)
    }
}
