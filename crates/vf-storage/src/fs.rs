//! Filesystem-backed [`ByteStorage`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use vf_core::{Error, Result, VideoId};

use crate::{ArtifactPath, ByteSink, ByteSource, ByteStorage};

/// Stores every video under `{root}/{video_id}/`.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if needed.
    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage_err("create storage root", &self.root, e))
    }
}

fn storage_err(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Storage(format!("{action} {}: {e}", path.display()))
}

#[async_trait]
impl ByteStorage for FsStorage {
    async fn write_stream(&self, path: &ArtifactPath) -> Result<ByteSink> {
        let full = self.local_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create directory", parent, e))?;
        }
        let file = File::create(&full)
            .await
            .map_err(|e| storage_err("create", &full, e))?;
        Ok(Box::new(file))
    }

    async fn read_stream(&self, path: &ArtifactPath) -> Result<(ByteSource, u64)> {
        let full = self.local_path(path);
        let file = match File::open(&full).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("artifact", path));
            }
            Err(e) => return Err(storage_err("open", &full, e)),
        };
        let len = file
            .metadata()
            .await
            .map_err(|e| storage_err("stat", &full, e))?
            .len();
        Ok((Box::new(file), len))
    }

    async fn delete(&self, path: &ArtifactPath) -> Result<()> {
        let full = self.local_path(path);
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("delete", &full, e)),
        }
    }

    async fn delete_video(&self, video_id: &VideoId) -> Result<()> {
        let dir = self.root.join(video_id.as_str());
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(video_id = %video_id, "Removed video directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("delete", &dir, e)),
        }
    }

    async fn exists(&self, path: &ArtifactPath) -> bool {
        fs::try_exists(self.local_path(path)).await.unwrap_or(false)
    }

    fn local_path(&self, path: &ArtifactPath) -> PathBuf {
        self.root.join(path.relative())
    }
}
