use std::sync::Arc;

use async_trait::async_trait;
use vf_core::Result;

use super::Dispatcher;
use crate::job::Job;
use crate::queue::JobQueue;

/// Dispatcher used inside the coordinating process: enqueue directly.
#[derive(Debug, Clone)]
pub struct LocalDispatcher {
    queue: Arc<JobQueue>,
}

impl LocalDispatcher {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Dispatcher for LocalDispatcher {
    async fn submit(&self, job: Job) -> Result<()> {
        tracing::debug!(job_id = %job.id(), video_id = %job.video_id(), kind = %job.kind(), "Enqueued locally");
        self.queue.enqueue(job);
        Ok(())
    }
}
