//! Reflects job outcomes back into the video records.

use std::sync::Arc;

use vf_core::{ResizeState, VideoRecord};
use vf_db::VideoStore;
use vf_storage::{ArtifactPath, ByteStorage};

use crate::job::{Job, JobKind, JobOutcome};

/// Applies a finished job's outcome to its video record.
///
/// Each application is one atomic read-modify-write through
/// [`VideoStore::update`], so readers in any process see either the old or
/// the new state of an entry, never a mix.
#[derive(Clone)]
pub struct StateUpdater {
    store: VideoStore,
    storage: Arc<dyn ByteStorage>,
}

impl std::fmt::Debug for StateUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateUpdater").field("store", &self.store).finish_non_exhaustive()
    }
}

impl StateUpdater {
    pub fn new(store: VideoStore, storage: Arc<dyn ByteStorage>) -> Self {
        Self { store, storage }
    }

    pub async fn apply(&self, job: &Job, outcome: &JobOutcome) {
        let kind = job.kind();

        if let JobOutcome::Failure { reason } = outcome {
            tracing::warn!(
                job_id = %job.id(),
                video_id = %job.video_id(),
                kind = %kind,
                reason = %reason,
                "Job failed"
            );
            match kind {
                JobKind::ExtractAudio => {
                    let partial = ArtifactPath::audio(job.video_id());
                    if let Err(e) = self.storage.delete(&partial).await {
                        tracing::warn!(job_id = %job.id(), error = %e, "Failed to remove partial audio");
                    }
                }
                // Nothing was recorded for the upload; the caller reports it.
                JobKind::Thumbnail => return,
                JobKind::Resize { .. } => {}
            }
        }

        let result = self.store.update(job.video_id(), |record| {
            apply_outcome(record, kind, outcome);
            Ok(())
        });

        match result {
            Ok(()) => tracing::debug!(job_id = %job.id(), video_id = %job.video_id(), "Video state updated"),
            Err(e) if e.is_not_found() => {
                tracing::warn!(job_id = %job.id(), video_id = %job.video_id(), "Video record is gone; outcome dropped");
            }
            Err(e) => {
                tracing::error!(job_id = %job.id(), video_id = %job.video_id(), error = %e, "Failed to update video state");
            }
        }
    }
}

/// The record mutation for one outcome.
pub(crate) fn apply_outcome(record: &mut VideoRecord, kind: JobKind, outcome: &JobOutcome) {
    match (kind, outcome) {
        (JobKind::Resize { key }, JobOutcome::Success { .. }) => {
            record.resizes.insert(key, ResizeState::DONE);
        }
        (JobKind::Resize { key }, JobOutcome::Failure { .. }) => {
            record.resizes.insert(key, ResizeState::FAILED);
        }
        (JobKind::ExtractAudio, JobOutcome::Success { .. }) => {
            record.extracted_audio = true;
            record.audio_processing = false;
        }
        (JobKind::ExtractAudio, JobOutcome::Failure { .. }) => {
            record.extracted_audio = false;
            record.audio_processing = false;
        }
        (JobKind::Thumbnail, JobOutcome::Success { dimensions }) => {
            if dimensions.is_some() {
                record.dimensions = *dimensions;
            }
        }
        (JobKind::Thumbnail, JobOutcome::Failure { .. }) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_video, storage_in};
    use vf_core::{Dimensions, ResizeKey, UserId, VideoId};
    use vf_db::pool::init_memory_pool;

    fn record() -> VideoRecord {
        VideoRecord::new(VideoId::new(), UserId::new(), "clip", "mp4", None)
    }

    #[test]
    fn resize_success_and_failure() {
        let key = ResizeKey::new(640, 480).unwrap();
        let mut v = record();
        v.resizes.insert(key, ResizeState::PROCESSING);

        apply_outcome(&mut v, JobKind::Resize { key }, &JobOutcome::Success { dimensions: None });
        assert_eq!(v.resize_state(&key), Some(ResizeState::DONE));

        apply_outcome(&mut v, JobKind::Resize { key }, &JobOutcome::failure("boom"));
        assert_eq!(v.resize_state(&key), Some(ResizeState::FAILED));
    }

    #[test]
    fn audio_flags() {
        let mut v = record();
        v.audio_processing = true;
        apply_outcome(&mut v, JobKind::ExtractAudio, &JobOutcome::Success { dimensions: None });
        assert!(v.extracted_audio);
        assert!(!v.audio_processing);

        let mut v = record();
        v.audio_processing = true;
        apply_outcome(&mut v, JobKind::ExtractAudio, &JobOutcome::failure("no audio stream"));
        assert!(!v.extracted_audio);
        assert!(!v.audio_processing);
    }

    #[test]
    fn thumbnail_stores_dimensions() {
        let mut v = record();
        let dims = Dimensions::new(1280, 720);
        apply_outcome(&mut v, JobKind::Thumbnail, &JobOutcome::Success { dimensions: Some(dims) });
        assert_eq!(v.dimensions, Some(dims));
    }

    #[tokio::test]
    async fn failed_audio_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        let store = VideoStore::new(init_memory_pool().unwrap());
        let video_id = insert_video(&store, "mp4");
        store.update(&video_id, |v| { v.audio_processing = true; Ok(()) }).unwrap();

        let partial = ArtifactPath::audio(&video_id);
        {
            use tokio::io::AsyncWriteExt;
            let mut sink = storage.write_stream(&partial).await.unwrap();
            sink.write_all(b"half").await.unwrap();
            sink.shutdown().await.unwrap();
        }

        let updater = StateUpdater::new(store.clone(), storage.clone());
        let job = Job::extract_audio(video_id.clone(), "mp4");
        updater.apply(&job, &JobOutcome::failure("codec died")).await;

        assert!(!storage.exists(&partial).await);
        let v = store.get(&video_id).unwrap();
        assert!(!v.audio_processing);
        assert!(!v.extracted_audio);
    }

    #[tokio::test]
    async fn missing_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(init_memory_pool().unwrap());
        let updater = StateUpdater::new(store, storage_in(dir.path()));
        let job = Job::resize(VideoId::new(), "mp4", ResizeKey::new(320, 240).unwrap());

        updater.apply(&job, &JobOutcome::Success { dimensions: None }).await;
    }
}
