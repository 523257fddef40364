//! vf-server: HTTP API and process roles.
//!
//! A deployment runs one **coordinator** (`vidforge coordinator`) and any
//! number of **frontends** (`vidforge serve`). Both serve the same HTTP API.
//! The coordinator additionally owns the job queue, accepts jobs from
//! frontends on the dispatch listener and runs the worker pool.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vf_av::{FfmpegCodec, MediaCodec, ToolRegistry};
use vf_core::config::Config;
use vf_db::VideoStore;
use vf_jobs::{
    DispatchListener, Dispatcher, JobExecutor, JobQueue, LocalDispatcher, RemoteDispatcher, StateUpdater,
    TranscodeService, WorkerPool,
};
use vf_storage::{ByteStorage, FsStorage};

pub use context::{AppContext, Role};

/// Open the metadata database, creating its directory when needed.
pub fn open_store(config: &Config) -> vf_core::Result<VideoStore> {
    let db_path = &config.server.db_path;
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let pool = vf_db::pool::init_pool(db_path)?;
    tracing::info!("Database opened at {}", db_path.display());
    Ok(VideoStore::new(pool))
}

/// Everything needed to serve and process jobs, before any task is spawned.
pub struct Services {
    pub ctx: AppContext,
    /// Worker pool and dispatch listener; present only for the coordinator
    /// until they are spawned.
    coordinator: Option<(WorkerPool, DispatchListener)>,
    dispatch_addr: Option<SocketAddr>,
}

impl Services {
    /// Wire up the components for `role` on top of the given codec, storage
    /// and store.
    pub async fn build(
        role: Role,
        config: Config,
        store: VideoStore,
        storage: Arc<dyn ByteStorage>,
        codec: Arc<dyn MediaCodec>,
        tools: Arc<ToolRegistry>,
    ) -> vf_core::Result<Self> {
        let timeout = Duration::from_secs(config.workers.job_timeout_secs);
        let executor = JobExecutor::new(codec, Arc::clone(&storage), timeout);

        let mut queue = None;
        let mut coordinator = None;
        let dispatcher: Arc<dyn Dispatcher> = match role {
            Role::Coordinator => {
                let jobs = Arc::new(JobQueue::new());
                let listener = DispatchListener::bind(&config.dispatch.addr, Arc::clone(&jobs)).await?;
                let updater = StateUpdater::new(store.clone(), Arc::clone(&storage));
                let pool = WorkerPool::new(Arc::clone(&jobs), executor.clone(), updater, config.workers.slots);
                coordinator = Some((pool, listener));
                queue = Some(Arc::clone(&jobs));
                Arc::new(LocalDispatcher::new(jobs))
            }
            Role::Frontend => Arc::new(RemoteDispatcher::from_config(&config.dispatch)),
        };

        let ctx = AppContext {
            role,
            config: Arc::new(config),
            transcoder: TranscodeService::new(store.clone(), dispatcher),
            store,
            storage,
            tools,
            executor,
            queue,
        };

        let dispatch_addr = match &coordinator {
            Some((_, listener)) => Some(listener.local_addr()?),
            None => None,
        };

        Ok(Self {
            ctx,
            coordinator,
            dispatch_addr,
        })
    }

    /// Address the dispatch listener is bound to (coordinator only).
    pub fn dispatch_addr(&self) -> Option<SocketAddr> {
        self.dispatch_addr
    }

    /// Spawn the worker pool and dispatch listener.
    pub fn spawn_background(&mut self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let Some((pool, listener)) = self.coordinator.take() else {
            return Vec::new();
        };
        vec![
            tokio::spawn(pool.run(cancel.clone())),
            tokio::spawn(listener.run(cancel.clone())),
        ]
    }
}

/// Start a vidforge process in the given role.
///
/// Returns when a shutdown signal is received.
pub async fn start(config: Config, role: Role) -> vf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let store = open_store(&config)?;

    let storage = FsStorage::new(&config.storage.root);
    storage.ensure_root().await?;

    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    for status in tools.status() {
        match &status.path {
            Some(path) => tracing::info!(
                tool = %status.tool,
                path = %path.display(),
                version = status.version.as_deref().unwrap_or("unknown"),
                "Tool found"
            ),
            None => tracing::warn!(tool = %status.tool, "Tool not found; uploads and transcoding will fail"),
        }
    }
    let codec = Arc::new(FfmpegCodec::new(
        Arc::clone(&tools),
        Duration::from_secs(config.workers.job_timeout_secs),
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vf_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let static_dir = config.server.static_dir.clone();

    let mut services = Services::build(role, config, store, Arc::new(storage), codec, tools).await?;

    let cancel = CancellationToken::new();
    let background = services.spawn_background(&cancel);
    if let Some(dispatch_addr) = services.dispatch_addr() {
        tracing::info!(%dispatch_addr, "Accepting jobs from frontends");
    }

    let app = router::build_router(services.ctx.clone(), static_dir);

    tracing::info!(%role, "Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| vf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    for handle in background {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C, SIGTERM or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
