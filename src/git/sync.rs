//! Cooperative join primitives
//!
//! Both suspend the calling task instead of blocking an OS thread.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, watch};

use super::job::Job;

/// Mutual-exclusion permits, handed out in FIFO order
#[derive(Debug, Clone)]
pub struct Semaphore {
    inner: Arc<tokio::sync::Semaphore>,
}

/// A held permit; dropping it releases the permit
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl Permit {
    /// Return the permit explicitly
    pub fn release(self) {}
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Semaphore::new(permits)),
        }
    }

    /// Suspend until a permit is free
    pub async fn acquire(&self) -> Permit {
        let permit = Arc::clone(&self.inner)
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        Permit { _permit: permit }
    }

    pub fn available_permits(&self) -> usize {
        self.inner.available_permits()
    }
}

/// N-way completion barrier
#[derive(Debug, Clone)]
pub struct CountDownLatch {
    remaining: Arc<watch::Sender<usize>>,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self {
            remaining: Arc::new(remaining),
        }
    }

    /// Decrement the counter; saturates at zero
    pub fn count_down(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn count(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Suspend until the counter reaches zero
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Start every job and suspend until all of them have exited or been killed
pub async fn join_jobs(jobs: &[Job]) {
    let latch = CountDownLatch::new(jobs.len());
    for job in jobs {
        job.start();
        let job = job.clone();
        let latch = latch.clone();
        tokio::spawn(async move {
            let _ = job.wait().await;
            latch.count_down();
        });
    }
    latch.wait().await;
}
