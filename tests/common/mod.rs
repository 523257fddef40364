//! Shared test harness for integration tests.
//!
//! [`TestHarness`] wires a coordinator or frontend exactly like
//! `vidforge coordinator` / `vidforge serve` do, but over a temporary
//! directory and a [`StubCodec`] instead of ffmpeg.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use vf_av::{MediaCodec, ToolRegistry};
use vf_core::config::Config;
use vf_core::{Dimensions, Error, Result, UserId};
use vf_db::VideoStore;
use vf_server::router::build_router;
use vf_server::{AppContext, Role, Services};
use vf_storage::{ByteStorage, FsStorage};

/// Codec that writes a marker file instead of transcoding.
///
/// Every output is staged as `{job_id}.{ext}`; the stems are recorded so
/// tests can count executions per job.
#[derive(Default)]
pub struct StubCodec {
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<Dimensions>>,
}

impl StubCodec {
    pub fn fail_resize_to(&self, dimensions: Dimensions) {
        self.failing.lock().push(dimensions);
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    async fn produce(&self, output: &Path) -> Result<()> {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls.lock().push(stem);
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
        if self.failing.lock().contains(&dimensions) {
            return Err(Error::codec("stub", format!("cannot scale to {dimensions}")));
        }
        self.produce(output).await
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub codec: Arc<StubCodec>,
    pub user: UserId,
    pub token: String,
    services: Services,
    cancel: CancellationToken,
    _dir: Arc<tempfile::TempDir>,
}

fn test_config(dir: &Path, dispatch_addr: &str) -> Config {
    let mut config = Config::default();
    config.server.db_path = dir.join("vidforge.db");
    config.server.static_dir = None;
    config.storage.root = dir.join("storage");
    config.dispatch.addr = dispatch_addr.to_string();
    config.dispatch.connect_timeout_ms = 500;
    config.dispatch.ack_timeout_ms = 1000;
    config.workers.slots = 2;
    config.workers.job_timeout_secs = 10;
    config
}

impl TestHarness {
    async fn build(role: Role, dir: Arc<tempfile::TempDir>, dispatch_addr: &str) -> Self {
        let config = test_config(dir.path(), dispatch_addr);
        let store = vf_server::open_store(&config).expect("failed to open store");
        let storage: Arc<dyn ByteStorage> = Arc::new(FsStorage::new(&config.storage.root));
        let codec = Arc::new(StubCodec::default());

        let services = Services::build(
            role,
            config,
            store.clone(),
            storage,
            codec.clone(),
            Arc::new(ToolRegistry::default()),
        )
        .await
        .expect("failed to build services");

        let user = UserId::new();
        let token = store.create_session(user).expect("failed to create session").token;

        Self {
            ctx: services.ctx.clone(),
            codec,
            user,
            token,
            services,
            cancel: CancellationToken::new(),
            _dir: dir,
        }
    }

    /// A coordinator with its dispatch listener on a random port. The worker
    /// pool is not running until [`start_workers`](Self::start_workers).
    pub async fn coordinator() -> Self {
        let dir = Arc::new(tempfile::tempdir().expect("failed to create temp dir"));
        Self::build(Role::Coordinator, dir, "127.0.0.1:0").await
    }

    /// A frontend sharing this coordinator's database and storage.
    pub async fn frontend(&self) -> Self {
        let addr = self
            .services
            .dispatch_addr()
            .expect("frontend needs a coordinator")
            .to_string();
        Self::build(Role::Frontend, Arc::clone(&self._dir), &addr).await
    }

    /// A frontend whose coordinator is not running.
    pub async fn orphan_frontend() -> Self {
        let dir = Arc::new(tempfile::tempdir().expect("failed to create temp dir"));
        let addr = unused_addr().await;
        Self::build(Role::Frontend, dir, &addr).await
    }

    /// Spawn the worker pool and dispatch listener.
    pub fn start_workers(&mut self) {
        self.services.spawn_background(&self.cancel);
    }

    pub fn store(&self) -> &VideoStore {
        &self.ctx.store
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone(), None)
    }

    pub fn cookie(&self) -> String {
        format!("token={}", self.token)
    }

    /// Request builder carrying this harness's session cookie.
    pub fn authed(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("cookie", self.cookie())
    }

    /// Upload a fake video through the API and return its id.
    pub async fn upload(&self, filename: &str) -> String {
        use tower::ServiceExt;

        let request = self
            .authed("POST", "/api/upload-video")
            .header("filename", filename)
            .body(Body::from("not really a video"))
            .unwrap();
        let response = self.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), 201, "upload failed");
        let body = body_json(response).await;
        body["videoId"].as_str().expect("videoId in response").to_string()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An address nothing listens on.
pub async fn unused_addr() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

pub async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    use http_body_util::BodyExt;
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Poll until `done` holds, failing the test after a few seconds.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
