//! Request-side entry point: validate, mark, dispatch.

use std::future::Future;
use std::sync::Arc;

use vf_core::{Error, ResizeKey, ResizeState, Result, VideoId, VideoRecord};
use vf_db::VideoStore;

use crate::dispatch::Dispatcher;
use crate::job::Job;

/// Why a request was not turned into a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A job for the same artifact is queued or running.
    AlreadyInProgress,
    /// The artifact already exists.
    AlreadyDone,
}

impl RejectReason {
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::AlreadyInProgress => "This artifact is already being processed.",
            RejectReason::AlreadyDone => "This artifact has already been produced.",
        }
    }
}

/// Result of a transcoding request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A job was handed to the coordinator.
    Accepted,
    Rejected(RejectReason),
}

/// What the atomic check-and-mark step decided.
enum Mark<P> {
    Rejected(RejectReason),
    Marked { prior: P, extension: String },
}

/// Turns user requests into jobs, at most one in flight per artifact.
#[derive(Clone)]
pub struct TranscodeService {
    store: VideoStore,
    dispatcher: Arc<dyn Dispatcher>,
}

impl std::fmt::Debug for TranscodeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeService").field("store", &self.store).finish_non_exhaustive()
    }
}

impl TranscodeService {
    pub fn new(store: VideoStore, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &VideoStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// Request a `width`x`height` rendition of `video_id`.
    ///
    /// A key that previously failed is accepted again. When the coordinator
    /// cannot be reached the entry is restored to what it was and the
    /// dispatch error is returned.
    ///
    /// Mark, submit and revert run on a spawned task, so dropping the
    /// returned future (a disconnected HTTP client) cannot stop the sequence
    /// halfway.
    pub async fn request_resize(&self, video_id: &VideoId, width: u32, height: u32) -> Result<RequestOutcome> {
        let key = ResizeKey::new(width, height)?;
        let service = self.clone();
        let video_id = video_id.clone();
        detached(async move { service.resize(&video_id, key).await }).await
    }

    /// Request extraction of the audio track of `video_id`.
    pub async fn request_audio_extraction(&self, video_id: &VideoId) -> Result<RequestOutcome> {
        let service = self.clone();
        let video_id = video_id.clone();
        detached(async move { service.extract_audio(&video_id).await }).await
    }

    async fn resize(&self, video_id: &VideoId, key: ResizeKey) -> Result<RequestOutcome> {
        let mark = self.store.update(video_id, |record| {
            let prior = record.resize_state(&key);
            Ok(match prior {
                Some(state) if state.processing => Mark::Rejected(RejectReason::AlreadyInProgress),
                Some(state) if state.done => Mark::Rejected(RejectReason::AlreadyDone),
                _ => {
                    record.resizes.insert(key, ResizeState::PROCESSING);
                    Mark::Marked {
                        prior,
                        extension: record.extension.clone(),
                    }
                }
            })
        })?;

        let (prior, extension) = match mark {
            Mark::Rejected(reason) => {
                tracing::debug!(video_id = %video_id, %key, ?reason, "Resize request rejected");
                return Ok(RequestOutcome::Rejected(reason));
            }
            Mark::Marked { prior, extension } => (prior, extension),
        };

        let job = Job::resize(video_id.clone(), extension, key);
        let job_id = job.id();
        if let Err(e) = self.dispatcher.submit(job).await {
            self.revert(video_id, |record| match prior {
                Some(state) => {
                    record.resizes.insert(key, state);
                }
                None => {
                    record.resizes.remove(&key);
                }
            });
            return Err(e);
        }

        tracing::info!(job_id = %job_id, video_id = %video_id, %key, "Resize accepted");
        Ok(RequestOutcome::Accepted)
    }

    async fn extract_audio(&self, video_id: &VideoId) -> Result<RequestOutcome> {
        let mark = self.store.update(video_id, |record| {
            Ok(if record.extracted_audio {
                Mark::Rejected(RejectReason::AlreadyDone)
            } else if record.audio_processing {
                Mark::Rejected(RejectReason::AlreadyInProgress)
            } else {
                record.audio_processing = true;
                Mark::Marked {
                    prior: (),
                    extension: record.extension.clone(),
                }
            })
        })?;

        let extension = match mark {
            Mark::Rejected(reason) => {
                tracing::debug!(video_id = %video_id, ?reason, "Audio extraction rejected");
                return Ok(RequestOutcome::Rejected(reason));
            }
            Mark::Marked { extension, .. } => extension,
        };

        let job = Job::extract_audio(video_id.clone(), extension);
        let job_id = job.id();
        if let Err(e) = self.dispatcher.submit(job).await {
            self.revert(video_id, |record| record.audio_processing = false);
            return Err(e);
        }

        tracing::info!(job_id = %job_id, video_id = %video_id, "Audio extraction accepted");
        Ok(RequestOutcome::Accepted)
    }

    /// Undo a mark after a failed hand-off. Failure here is logged; the
    /// dispatch error is what the caller needs to see.
    fn revert(&self, video_id: &VideoId, undo: impl FnOnce(&mut VideoRecord)) {
        let result = self.store.update(video_id, |record| {
            undo(record);
            Ok(())
        });
        if let Err(e) = result {
            tracing::error!(video_id = %video_id, error = %e, "Failed to revert processing mark");
        }
    }
}

/// Run `task` to completion regardless of whether the caller stays around.
async fn detached<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| Error::Internal(format!("request task failed: {e}")))?
}
