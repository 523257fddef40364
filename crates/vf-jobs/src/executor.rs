//! Runs one job: codec into a staging file, then publish into storage.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use vf_av::MediaCodec;
use vf_core::{Dimensions, Error, Result};
use vf_storage::{ArtifactPath, ByteStorage};

use crate::job::{Job, JobKind, JobOutcome};

/// Where one job reads from and writes to.
struct Plan {
    original: ArtifactPath,
    staging: ArtifactPath,
    destination: ArtifactPath,
}

impl Plan {
    fn for_job(job: &Job) -> Result<Self> {
        let video_id = job.video_id();
        let ext = job.source_extension();

        let (destination, staging_ext) = match job.kind() {
            JobKind::Resize { key } => (ArtifactPath::resize(video_id, key, ext)?, ext),
            JobKind::ExtractAudio => (ArtifactPath::audio(video_id), "aac"),
            JobKind::Thumbnail => (ArtifactPath::thumbnail(video_id), "jpg"),
        };

        Ok(Self {
            original: ArtifactPath::original(video_id, ext)?,
            staging: ArtifactPath::staging(video_id, job.id(), staging_ext)?,
            destination,
        })
    }
}

/// Executes jobs against a codec and a byte store.
///
/// Shared by every worker slot and by the inline thumbnail step at upload.
#[derive(Clone)]
pub struct JobExecutor {
    codec: Arc<dyn MediaCodec>,
    storage: Arc<dyn ByteStorage>,
    timeout: Duration,
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl JobExecutor {
    pub fn new(codec: Arc<dyn MediaCodec>, storage: Arc<dyn ByteStorage>, timeout: Duration) -> Self {
        Self {
            codec,
            storage,
            timeout,
        }
    }

    pub fn storage(&self) -> &Arc<dyn ByteStorage> {
        &self.storage
    }

    /// Run `job` to completion. Never panics and never returns an error:
    /// every failure, including the timeout, becomes [`JobOutcome::Failure`].
    pub async fn execute(&self, job: &Job) -> JobOutcome {
        let plan = match Plan::for_job(job) {
            Ok(plan) => plan,
            Err(e) => return JobOutcome::failure(e.to_string()),
        };

        let outcome = match tokio::time::timeout(self.timeout, self.run(job, &plan)).await {
            Ok(Ok(dimensions)) => JobOutcome::Success { dimensions },
            Ok(Err(e)) => JobOutcome::failure(e.to_string()),
            Err(_) => JobOutcome::failure(format!("timed out after {}s", self.timeout.as_secs_f64())),
        };

        if !outcome.is_success() {
            // A timeout can land mid-publish; never leave a truncated artifact.
            if let Err(e) = self.storage.delete(&plan.destination).await {
                tracing::warn!(job_id = %job.id(), path = %plan.destination, error = %e, "Failed to remove partial artifact");
            }
        }
        if let Err(e) = self.storage.delete(&plan.staging).await {
            tracing::warn!(job_id = %job.id(), error = %e, "Failed to remove staging output");
        }
        outcome
    }

    async fn run(&self, job: &Job, plan: &Plan) -> Result<Option<Dimensions>> {
        if !self.storage.exists(&plan.original).await {
            return Err(Error::not_found("original upload", &plan.original));
        }
        let input = self.storage.local_path(&plan.original);

        let staging = self.storage.local_path(&plan.staging);
        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("create staging directory: {e}")))?;
        }

        let dimensions = match job.kind() {
            JobKind::Resize { key } => {
                self.codec.resize(&input, &staging, key.dimensions()).await?;
                None
            }
            JobKind::ExtractAudio => {
                self.codec.extract_audio(&input, &staging).await?;
                None
            }
            JobKind::Thumbnail => Some(self.codec.thumbnail_and_dimensions(&input, &staging).await?),
        };

        self.publish(&staging, &plan.destination).await?;
        Ok(dimensions)
    }

    /// Stream the staged file into storage at `destination`.
    async fn publish(&self, staging: &Path, destination: &ArtifactPath) -> Result<()> {
        let mut file = tokio::fs::File::open(staging)
            .await
            .map_err(|e| Error::Storage(format!("open staged output: {e}")))?;
        let mut sink = self.storage.write_stream(destination).await?;
        tokio::io::copy(&mut file, &mut sink)
            .await
            .map_err(|e| Error::Storage(format!("write {destination}: {e}")))?;
        sink.shutdown()
            .await
            .map_err(|e| Error::Storage(format!("flush {destination}: {e}")))?;
        Ok(())
    }
}
