//! vf-core: shared types, IDs, errors, configuration, and the video domain model.
//!
//! This crate is the foundational dependency for all other vf-* crates,
//! providing type-safe identifiers, a unified error type, the
//! [`VideoRecord`](video::VideoRecord) shape shared by the request path and
//! the worker pool, and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod video;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use video::*;
