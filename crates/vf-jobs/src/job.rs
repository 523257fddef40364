//! The unit of transcoding work.

use std::fmt;

use serde::{Deserialize, Serialize};
use vf_core::{Dimensions, JobId, ResizeKey, VideoId};

/// What a [`Job`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Scale the original to `key`, written as `{w}x{h}.{ext}`.
    Resize { key: ResizeKey },
    /// Copy the audio track to `audio.aac`.
    ExtractAudio,
    /// Write `thumbnail.jpg` and probe the original's dimensions.
    Thumbnail,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Resize { key } => write!(f, "resize {key}"),
            JobKind::ExtractAudio => f.write_str("extract-audio"),
            JobKind::Thumbnail => f.write_str("thumbnail"),
        }
    }
}

/// One transcoding request. Immutable once created.
///
/// Every constructor mints a fresh [`JobId`]; two jobs built from the same
/// arguments are still distinct instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    video_id: VideoId,
    source_extension: String,
    kind: JobKind,
}

impl Job {
    fn new(video_id: VideoId, source_extension: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: JobId::new(),
            video_id,
            source_extension: source_extension.into(),
            kind,
        }
    }

    pub fn resize(video_id: VideoId, source_extension: impl Into<String>, key: ResizeKey) -> Self {
        Self::new(video_id, source_extension, JobKind::Resize { key })
    }

    pub fn extract_audio(video_id: VideoId, source_extension: impl Into<String>) -> Self {
        Self::new(video_id, source_extension, JobKind::ExtractAudio)
    }

    pub fn thumbnail(video_id: VideoId, source_extension: impl Into<String>) -> Self {
        Self::new(video_id, source_extension, JobKind::Thumbnail)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// Container extension of the original upload.
    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

/// Result of executing one job, consumed by the state updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The artifact is stored. Thumbnail jobs also report the probed size.
    Success { dimensions: Option<Dimensions> },
    /// Codec, storage or timeout failure.
    Failure { reason: String },
}

impl JobOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        JobOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_mint_distinct_ids() {
        let key = ResizeKey::new(640, 480).unwrap();
        let id = VideoId::new();
        let a = Job::resize(id.clone(), "mp4", key);
        let b = Job::resize(id, "mp4", key);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), b.kind());
    }

    #[test]
    fn wire_shape() {
        let job = Job::resize("0a1b2c3d".parse().unwrap(), "mov", ResizeKey::new(320, 240).unwrap());
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["video_id"], "0a1b2c3d");
        assert_eq!(json["kind"]["type"], "resize");
        assert_eq!(json["kind"]["key"], "320x240");

        let back: Job = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn invalid_key_on_the_wire_is_rejected() {
        let json = serde_json::json!({
            "id": JobId::new(),
            "video_id": "0a1b2c3d",
            "source_extension": "mp4",
            "kind": { "type": "resize", "key": "../../etc" }
        });
        assert!(serde_json::from_value::<Job>(json).is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(JobKind::Resize { key: ResizeKey::new(2, 2).unwrap() }.to_string(), "resize 2x2");
        assert_eq!(JobKind::ExtractAudio.to_string(), "extract-audio");
    }
}
