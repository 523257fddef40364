//! In-memory FIFO of pending jobs, owned by the coordinating process.
//!
//! The queue is not persisted. Jobs still queued when the coordinator stops
//! are lost and their records stay marked as processing until
//! [`reconcile_interrupted`](crate::reconcile::reconcile_interrupted) runs.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::job::Job;

/// FIFO shared by the dispatch adapters and the worker slots.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    available: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `job` to the tail and wake one waiting slot.
    ///
    /// No deduplication happens here; callers mark the record first.
    pub fn enqueue(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.available.notify_one();
    }

    /// Pop the head without waiting.
    pub fn try_dequeue(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    /// Wait for the next job.
    ///
    /// Returns `None` once `cancel` fires. A job is handed to exactly one
    /// caller.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<Job> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so an enqueue in between is not missed.
            notified.as_mut().enable();

            if let Some(job) = self.try_dequeue() {
                return Some(job);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}
