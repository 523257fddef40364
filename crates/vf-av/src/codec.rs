//! The codec abstraction the worker pool drives.

use std::path::Path;

use async_trait::async_trait;
use vf_core::{Dimensions, Result};

/// Media operations that turn an uploaded video into derived artifacts.
///
/// Every method reads `input` and writes a complete file at the output path.
/// Implementations may take minutes; callers bound them with a timeout and
/// treat a partial output as garbage.
#[async_trait]
pub trait MediaCodec: Send + Sync {
    /// Extract a representative frame as JPEG into `thumbnail_out` and probe
    /// the pixel dimensions of the first video stream.
    async fn thumbnail_and_dimensions(&self, input: &Path, thumbnail_out: &Path) -> Result<Dimensions>;

    /// Copy the audio track into an AAC file.
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Scale the video to `dimensions`, keeping the audio track as-is.
    async fn resize(&self, input: &Path, output: &Path, dimensions: Dimensions) -> Result<()>;
}
