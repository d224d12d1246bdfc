//! One-at-a-time execution gate
//!
//! Some git commands (notably `show`) have been seen to exit successfully
//! with no output when several run at once against the same repository.
//! Jobs submitted here run strictly one after another in FIFO order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use super::GitError;
use super::job::Job;
use super::sync::Semaphore;

#[derive(Debug)]
struct QueueInner {
    gate: Semaphore,
    fifo: Mutex<VecDeque<u64>>,
}

/// FIFO queue with at most one job in flight
#[derive(Debug, Clone)]
pub struct SerialJobQueue {
    inner: Arc<QueueInner>,
}

impl Default for SerialJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialJobQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                gate: Semaphore::new(1),
                fifo: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Append `job`, run it once every job ahead of it has exited, and
    /// return its exit code
    ///
    /// The job leaves the queue when it exits, is killed, or the returned
    /// future is dropped. Dropping the future while the job runs kills the
    /// job before the next one may start.
    pub async fn enqueue(&self, job: &Job) -> Result<i32, GitError> {
        let id = job.id();
        self.fifo().push_back(id);
        let dequeue = scopeguard::guard(id, |id| self.remove(id));
        trace!(job = id, queued = self.len(), "job queued");

        let permit = self.inner.gate.acquire().await;
        // Dropped before the permit: a running job never outlives its turn
        let running = scopeguard::guard(job, |job| job.kill());
        let result = job.run().await;

        drop(running);
        drop(dequeue);
        permit.release();
        result
    }

    /// Number of queued jobs, including the running one
    pub fn len(&self) -> usize {
        self.fifo().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo().is_empty()
    }

    /// Id of the job at the head of the queue
    pub fn head(&self) -> Option<u64> {
        self.fifo().front().copied()
    }

    fn remove(&self, id: u64) {
        let mut fifo = self.fifo();
        if let Some(pos) = fifo.iter().position(|&queued| queued == id) {
            fifo.remove(pos);
        }
    }

    fn fifo(&self) -> MutexGuard<'_, VecDeque<u64>> {
        self.inner
            .fifo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
