//! Shared state handed to every route handler.

use std::fmt;
use std::sync::Arc;

use vf_av::ToolRegistry;
use vf_core::config::Config;
use vf_db::VideoStore;
use vf_jobs::{JobExecutor, JobQueue, TranscodeService};
use vf_storage::ByteStorage;

/// Which half of the deployment this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the job queue, the dispatch listener and the worker pool.
    Coordinator,
    /// Serves HTTP only and forwards jobs to the coordinator.
    Frontend,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Coordinator => "coordinator",
            Role::Frontend => "frontend",
        })
    }
}

/// Infrastructure shared across handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub role: Role,
    pub config: Arc<Config>,
    pub store: VideoStore,
    pub storage: Arc<dyn ByteStorage>,
    pub tools: Arc<ToolRegistry>,
    /// Runs the thumbnail step inline during upload.
    pub executor: JobExecutor,
    pub transcoder: TranscodeService,
    /// Present only in the coordinator.
    pub queue: Option<Arc<JobQueue>>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("role", &self.role)
            .field("store", &self.store)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
