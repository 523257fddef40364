//! Hand-off of jobs from request-handling processes to the coordinator.
//!
//! The coordinator owns the [`JobQueue`](crate::queue::JobQueue) and submits
//! through a [`LocalDispatcher`]. Every other process holds a
//! [`RemoteDispatcher`] connected to the coordinator's [`DispatchListener`].
//! Which one a process gets is decided once at startup; callers only see
//! `Arc<dyn Dispatcher>`.

mod listener;
mod local;
pub mod protocol;
mod remote;

pub use listener::DispatchListener;
pub use local::LocalDispatcher;
pub use protocol::DispatchFrame;
pub use remote::RemoteDispatcher;

use async_trait::async_trait;
use vf_core::Result;

use crate::job::Job;

/// Deliver a job to the coordinating process's queue.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Returns once the coordinator has taken ownership of `job`. This is a
    /// hand-off acknowledgement, not completion.
    ///
    /// # Errors
    ///
    /// [`vf_core::Error::DispatchUnavailable`] when the coordinator cannot be
    /// reached or does not acknowledge in time.
    async fn submit(&self, job: Job) -> Result<()>;

    /// Check that the coordinator is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
