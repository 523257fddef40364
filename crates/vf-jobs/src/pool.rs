//! Fixed set of worker slots draining the job queue.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::executor::JobExecutor;
use crate::queue::JobQueue;
use crate::updater::StateUpdater;

/// Runs up to `slots` jobs at once.
///
/// Each slot is a tokio task; the codec work itself happens in child
/// processes, so slots transcode in parallel. Jobs are never retried.
#[derive(Debug)]
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    executor: JobExecutor,
    updater: StateUpdater,
    slots: usize,
}

impl WorkerPool {
    pub fn new(queue: Arc<JobQueue>, executor: JobExecutor, updater: StateUpdater, slots: usize) -> Self {
        Self {
            queue,
            executor,
            updater,
            slots: slots.max(1),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Run every slot until `cancel` fires.
    ///
    /// Cancellation is observed between jobs: a slot finishes the job it is
    /// executing before it exits. Jobs still queued are dropped.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(slots = self.slots, "Worker pool started");

        let mut set = JoinSet::new();
        for slot in 0..self.slots {
            set.spawn(run_slot(
                slot,
                Arc::clone(&self.queue),
                self.executor.clone(),
                self.updater.clone(),
                cancel.clone(),
            ));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker slot terminated abnormally");
            }
        }

        let dropped = self.queue.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Worker pool stopped with jobs still queued");
        } else {
            tracing::info!("Worker pool stopped");
        }
    }
}

async fn run_slot(
    slot: usize,
    queue: Arc<JobQueue>,
    executor: JobExecutor,
    updater: StateUpdater,
    cancel: CancellationToken,
) {
    while let Some(job) = queue.dequeue(&cancel).await {
        let started = Instant::now();
        tracing::info!(
            slot,
            job_id = %job.id(),
            video_id = %job.video_id(),
            kind = %job.kind(),
            "Job started"
        );

        let outcome = executor.execute(&job).await;
        updater.apply(&job, &outcome).await;

        tracing::info!(
            slot,
            job_id = %job.id(),
            success = outcome.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        );
    }
}
