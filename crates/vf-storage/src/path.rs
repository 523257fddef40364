//! Deterministic artifact locations.

use std::fmt;
use std::path::PathBuf;

use vf_core::{Error, JobId, ResizeKey, Result, VideoId};

/// Directory (inside a video's directory) holding in-progress codec output.
pub const STAGING_DIR: &str = ".staging";

/// Location of one stored file, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath {
    video_id: VideoId,
    kind: ArtifactKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ArtifactKind {
    Original { extension: String },
    Thumbnail,
    Audio,
    Resize { key: ResizeKey, extension: String },
    Staging { file_name: String },
}

/// Container extensions are short lowercase alphanumerics.
fn check_extension(extension: &str) -> Result<String> {
    let ok = !extension.is_empty()
        && extension.len() <= 8
        && extension
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if ok {
        Ok(extension.to_string())
    } else {
        Err(Error::Validation(format!("invalid file extension '{extension}'")))
    }
}

impl ArtifactPath {
    /// The uploaded source file: `{video}/original.{ext}`.
    pub fn original(video_id: &VideoId, extension: &str) -> Result<Self> {
        Ok(Self {
            video_id: video_id.clone(),
            kind: ArtifactKind::Original {
                extension: check_extension(extension)?,
            },
        })
    }

    /// `{video}/thumbnail.jpg`.
    pub fn thumbnail(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.clone(),
            kind: ArtifactKind::Thumbnail,
        }
    }

    /// `{video}/audio.aac`.
    pub fn audio(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.clone(),
            kind: ArtifactKind::Audio,
        }
    }

    /// A resized rendition: `{video}/{w}x{h}.{ext}`.
    pub fn resize(video_id: &VideoId, key: ResizeKey, extension: &str) -> Result<Self> {
        Ok(Self {
            video_id: video_id.clone(),
            kind: ArtifactKind::Resize {
                key,
                extension: check_extension(extension)?,
            },
        })
    }

    /// Scratch output of one job: `{video}/.staging/{job}.{ext}`.
    pub fn staging(video_id: &VideoId, job_id: JobId, extension: &str) -> Result<Self> {
        Ok(Self {
            video_id: video_id.clone(),
            kind: ArtifactKind::Staging {
                file_name: format!("{job_id}.{}", check_extension(extension)?),
            },
        })
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// File name component of the path.
    pub fn file_name(&self) -> String {
        match &self.kind {
            ArtifactKind::Original { extension } => format!("original.{extension}"),
            ArtifactKind::Thumbnail => "thumbnail.jpg".to_string(),
            ArtifactKind::Audio => "audio.aac".to_string(),
            ArtifactKind::Resize { key, extension } => format!("{key}.{extension}"),
            ArtifactKind::Staging { file_name } => file_name.clone(),
        }
    }

    /// Path relative to the storage root.
    pub fn relative(&self) -> PathBuf {
        let mut path = PathBuf::from(self.video_id.as_str());
        if matches!(self.kind, ArtifactKind::Staging { .. }) {
            path.push(STAGING_DIR);
        }
        path.push(self.file_name());
        path
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative().display())
    }
}
