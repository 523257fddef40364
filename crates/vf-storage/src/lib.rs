//! # vf-storage
//!
//! Byte storage for original uploads, derived artifacts and staging files.
//!
//! Storage is hierarchical and keyed by [`VideoId`](vf_core::VideoId): every
//! file a video owns lives under its own directory, and every file name is
//! derived from validated types ([`ArtifactPath`]), never from raw user input.

pub mod fs;
pub mod path;

pub use fs::FsStorage;
pub use path::ArtifactPath;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use vf_core::{Result, VideoId};

/// Boxed streaming sink returned by [`ByteStorage::write_stream`].
pub type ByteSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed streaming source returned by [`ByteStorage::read_stream`].
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Streaming access to stored media.
#[async_trait]
pub trait ByteStorage: Send + Sync {
    /// Open a sink that creates or truncates `path`.
    async fn write_stream(&self, path: &ArtifactPath) -> Result<ByteSink>;

    /// Open `path` for reading, returning the source and its length in bytes.
    ///
    /// Returns [`vf_core::Error::NotFound`] when nothing is stored there.
    async fn read_stream(&self, path: &ArtifactPath) -> Result<(ByteSource, u64)>;

    /// Remove `path`. Removing a missing file is not an error.
    async fn delete(&self, path: &ArtifactPath) -> Result<()>;

    /// Remove everything stored for a video.
    async fn delete_video(&self, video_id: &VideoId) -> Result<()>;

    /// Whether `path` currently holds data.
    async fn exists(&self, path: &ArtifactPath) -> bool;

    /// Local filesystem location of `path`, for tools that need a real file.
    fn local_path(&self, path: &ArtifactPath) -> PathBuf;
}
