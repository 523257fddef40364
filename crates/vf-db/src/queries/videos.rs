//! Video record persistence.

use rusqlite::Connection;
use vf_core::{Error, Result, UserId, VideoId, VideoRecord};

use crate::models::{video_from_row, VIDEO_COLS};

fn encode_resizes(record: &VideoRecord) -> Result<String> {
    serde_json::to_string(&record.resizes)
        .map_err(|e| Error::Internal(format!("failed to encode resizes: {e}")))
}

/// Insert a newly uploaded video.
pub fn insert_video(conn: &Connection, record: &VideoRecord) -> Result<()> {
    let resizes = encode_resizes(record)?;
    conn.execute(
        "INSERT INTO videos (video_id, user_id, name, extension, width, height,
            extracted_audio, audio_processing, resizes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            record.video_id.as_str(),
            record.user_id.to_string(),
            &record.name,
            &record.extension,
            record.dimensions.map(|d| d.width),
            record.dimensions.map(|d| d.height),
            record.extracted_audio,
            record.audio_processing,
            resizes,
            &record.created_at,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get a video by ID.
pub fn get_video(conn: &Connection, id: &VideoId) -> Result<Option<VideoRecord>> {
    let q = format!("SELECT {VIDEO_COLS} FROM videos WHERE video_id = ?1");
    let result = conn.query_row(&q, [id.as_str()], video_from_row);
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a user's videos, newest first.
pub fn list_videos_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<VideoRecord>> {
    let q = format!(
        "SELECT {VIDEO_COLS} FROM videos WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], video_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List all video IDs.
pub fn list_video_ids(conn: &Connection) -> Result<Vec<VideoId>> {
    let mut stmt = conn
        .prepare("SELECT video_id FROM videos ORDER BY rowid")
        .map_err(|e| Error::database(e.to_string()))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    ids.iter().map(|s| s.parse()).collect()
}

/// Write back the mutable artifact-state columns of a record.
///
/// Identity columns (`video_id`, `user_id`, `name`, `extension`, `created_at`)
/// are never rewritten.
pub fn save_video_state(conn: &Connection, record: &VideoRecord) -> Result<bool> {
    let resizes = encode_resizes(record)?;
    let n = conn
        .execute(
            "UPDATE videos SET width = ?1, height = ?2, extracted_audio = ?3,
                audio_processing = ?4, resizes = ?5
             WHERE video_id = ?6",
            rusqlite::params![
                record.dimensions.map(|d| d.width),
                record.dimensions.map(|d| d.height),
                record.extracted_audio,
                record.audio_processing,
                resizes,
                record.video_id.as_str(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
