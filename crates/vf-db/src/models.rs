//! Row mappings for database tables.

use std::str::FromStr;

use rusqlite::types::Type;
use uuid::Uuid;
use vf_core::{Dimensions, UserId, VideoId, VideoRecord};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_video_id(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<VideoId> {
    let s: String = row.get(idx)?;
    VideoId::from_str(&s).map_err(|e| conversion_err(idx, e))
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// Column list matching [`video_from_row`].
pub const VIDEO_COLS: &str = "video_id, user_id, name, extension, width, height,
    extracted_audio, audio_processing, resizes, created_at";

/// Build a [`VideoRecord`] from a row selected with [`VIDEO_COLS`].
pub fn video_from_row(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    let width: Option<u32> = row.get(4)?;
    let height: Option<u32> = row.get(5)?;
    let resizes: String = row.get(8)?;

    Ok(VideoRecord {
        video_id: parse_video_id(row, 0)?,
        user_id: parse_id::<UserId>(row, 1)?,
        name: row.get(2)?,
        extension: row.get(3)?,
        dimensions: width.zip(height).map(|(w, h)| Dimensions::new(w, h)),
        extracted_audio: row.get(6)?,
        audio_processing: row.get(7)?,
        resizes: serde_json::from_str(&resizes).map_err(|e| conversion_err(8, e))?,
        created_at: row.get(9)?,
    })
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: String,
}

impl Session {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            token: row.get(0)?,
            user_id: parse_id(row, 1)?,
            created_at: row.get(2)?,
        })
    }
}
