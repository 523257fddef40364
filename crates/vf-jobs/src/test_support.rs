//! Stubs shared by the unit tests of this crate.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use vf_av::MediaCodec;
use vf_core::{Dimensions, Error, JobId, Result, UserId, VideoId, VideoRecord};
use vf_db::VideoStore;
use vf_storage::{ArtifactPath, ByteStorage, FsStorage};

use crate::dispatch::Dispatcher;
use crate::job::Job;

/// Codec that writes a marker file and records which job called it.
///
/// Output files are staged as `{job_id}.{ext}`, so the file stem identifies
/// the job.
pub(crate) struct StubCodec {
    calls: Mutex<Vec<String>>,
    fail_resize: Mutex<HashSet<Dimensions>>,
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl StubCodec {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_resize: Mutex::new(HashSet::new()),
            delay: Duration::ZERO,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::new() }
    }

    pub fn fail_resize_to(&self, dimensions: Dimensions) {
        self.fail_resize.lock().insert(dimensions);
    }

    pub fn calls_for(&self, job_id: JobId) -> usize {
        let id = job_id.to_string();
        self.calls.lock().iter().filter(|c| **c == id).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Most codec calls ever in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn produce(&self, output: &Path) -> Result<()> {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls.lock().push(stem);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        tokio::fs::write(output, b"stub output").await?;
        Ok(())
    }
}

#[async_trait]
impl MediaCodec for StubCodec {
    async fn thumbnail_and_dimensions(&self, _input: &Path, thumbnail_out: &Path) -> Result<Dimensions> {
        self.produce(thumbnail_out).await?;
        Ok(Dimensions::new(1920, 1080))
    }

    async fn extract_audio(&self, _input: &Path, output: &Path) -> Result<()> {
        self.produce(output).await
    }

    async fn resize(&self, _input: &Path, output: &Path, dimensions: Dimensions) -> Result<()> {
        self.produce(output).await?;
        if self.fail_resize.lock().contains(&dimensions) {
            return Err(Error::codec("stub", format!("refusing to scale to {dimensions}")));
        }
        Ok(())
    }
}

/// Dispatcher whose coordinator is never there.
pub(crate) struct UnreachableDispatcher;

#[async_trait]
impl Dispatcher for UnreachableDispatcher {
    async fn submit(&self, _job: Job) -> Result<()> {
        Err(Error::DispatchUnavailable("connection refused".into()))
    }
}

/// Dispatcher that waits before handing the job on.
pub(crate) struct SlowDispatcher<D> {
    inner: D,
    delay: Duration,
}

impl<D> SlowDispatcher<D> {
    pub fn new(inner: D, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<D: Dispatcher> Dispatcher for SlowDispatcher<D> {
    async fn submit(&self, job: Job) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.submit(job).await
    }
}

pub(crate) fn storage_in(root: &Path) -> Arc<dyn ByteStorage> {
    Arc::new(FsStorage::new(root))
}

/// Insert a fresh record with the given upload extension.
pub(crate) fn insert_video(store: &VideoStore, extension: &str) -> VideoId {
    let record = VideoRecord::new(VideoId::new(), UserId::new(), "clip", extension, None);
    store.insert(&record).unwrap();
    record.video_id
}

/// Put a fake original upload into storage.
pub(crate) async fn write_original(storage: &Arc<dyn ByteStorage>, video_id: &VideoId, extension: &str) {
    let path = ArtifactPath::original(video_id, extension).unwrap();
    let mut sink = storage.write_stream(&path).await.unwrap();
    sink.write_all(b"original bytes").await.unwrap();
    sink.shutdown().await.unwrap();
}
