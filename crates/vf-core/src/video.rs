//! Video domain model shared by the request path, the worker pool and the
//! metadata store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::{UserId, VideoId};
use crate::{Error, Result};

/// Largest accepted edge for a resize target (8K UHD width).
pub const MAX_DIMENSION: u32 = 7680;

/// Smallest accepted edge for a resize target.
pub const MIN_DIMENSION: u32 = 2;

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Width and height of a video stream, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// ResizeKey
// ---------------------------------------------------------------------------

/// Validated `"{width}x{height}"` key of a resize rendition.
///
/// The key is used verbatim as a storage file name, so construction only
/// succeeds for two decimal numbers within [`MIN_DIMENSION`]..=[`MAX_DIMENSION`].
/// Both edges must be even, which the H.264 encoder requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResizeKey(Dimensions);

impl ResizeKey {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        for (name, value) in [("width", width), ("height", height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(Error::Validation(format!(
                    "{name} must be between {MIN_DIMENSION} and {MAX_DIMENSION}, got {value}"
                )));
            }
            if value % 2 != 0 {
                return Err(Error::Validation(format!("{name} must be even, got {value}")));
            }
        }
        Ok(Self(Dimensions::new(width, height)))
    }

    pub fn dimensions(&self) -> Dimensions {
        self.0
    }
}

impl fmt::Display for ResizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ResizeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("invalid dimensions '{s}', expected WIDTHxHEIGHT"));
        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        let all_digits = |p: &str| !p.is_empty() && p.len() <= 5 && p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(w) || !all_digits(h) {
            return Err(invalid());
        }
        let width = w.parse().map_err(|_| invalid())?;
        let height = h.parse().map_err(|_| invalid())?;
        Self::new(width, height)
    }
}

impl Serialize for ResizeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResizeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ResizeState
// ---------------------------------------------------------------------------

/// Progress flags of one resize rendition.
///
/// Exactly one of the three flags is set in every state the system writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResizeState {
    pub processing: bool,
    pub done: bool,
    pub failed: bool,
}

impl ResizeState {
    pub const PROCESSING: Self = Self { processing: true, done: false, failed: false };
    pub const DONE: Self = Self { processing: false, done: true, failed: false };
    pub const FAILED: Self = Self { processing: false, done: false, failed: true };
}

// ---------------------------------------------------------------------------
// VideoRecord
// ---------------------------------------------------------------------------

/// Metadata of one uploaded video and the state of its derived artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub video_id: VideoId,
    pub user_id: UserId,
    /// File name of the upload without its extension.
    pub name: String,
    /// Lowercase container extension of the original upload.
    pub extension: String,
    pub dimensions: Option<Dimensions>,
    pub extracted_audio: bool,
    /// An audio extraction job is queued or running.
    pub audio_processing: bool,
    pub resizes: BTreeMap<ResizeKey, ResizeState>,
    pub created_at: String,
}

impl VideoRecord {
    /// A freshly uploaded video with no derived renditions yet.
    pub fn new(
        video_id: VideoId,
        user_id: UserId,
        name: impl Into<String>,
        extension: impl Into<String>,
        dimensions: Option<Dimensions>,
    ) -> Self {
        Self {
            video_id,
            user_id,
            name: name.into(),
            extension: extension.into(),
            dimensions,
            extracted_audio: false,
            audio_processing: false,
            resizes: BTreeMap::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn resize_state(&self, key: &ResizeKey) -> Option<ResizeState> {
        self.resizes.get(key).copied()
    }
}
