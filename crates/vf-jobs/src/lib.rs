//! # vf-jobs
//!
//! The transcoding job subsystem.
//!
//! Request handlers call [`TranscodeService`], which marks the video record
//! and hands a [`Job`] to a [`Dispatcher`]. In the coordinating process the
//! job lands in the [`JobQueue`]; the [`WorkerPool`] drains it through the
//! [`JobExecutor`] and the [`StateUpdater`] writes the outcome back.
//!
//! ```text
//!  serve ──RemoteDispatcher──TCP──▶ DispatchListener ─┐
//!  coordinator ──LocalDispatcher──────────────────────┴─▶ JobQueue ─▶ WorkerPool
//!                                                                    │
//!                                 VideoStore ◀── StateUpdater ◀── JobExecutor
//! ```

pub mod dispatch;
pub mod executor;
pub mod job;
pub mod pool;
pub mod queue;
pub mod reconcile;
pub mod service;
pub mod updater;

#[cfg(test)]
mod test_support;

pub use dispatch::{DispatchListener, Dispatcher, LocalDispatcher, RemoteDispatcher};
pub use executor::JobExecutor;
pub use job::{Job, JobKind, JobOutcome};
pub use pool::WorkerPool;
pub use queue::JobQueue;
pub use reconcile::{reconcile_interrupted, ReconcileReport};
pub use service::{RejectReason, RequestOutcome, TranscodeService};
pub use updater::StateUpdater;
