//! Route handlers for the HTTP API.

pub mod assets;
pub mod health;
pub mod videos;

use vf_core::{Error, UserId, VideoId, VideoRecord};

use crate::context::AppContext;

/// Load a video owned by `user_id`.
///
/// Videos of other users are reported as missing.
pub(crate) fn owned_video(ctx: &AppContext, user_id: UserId, video_id: &str) -> Result<VideoRecord, Error> {
    let video_id: VideoId = video_id.parse()?;
    let record = ctx.store.get(&video_id)?;
    if record.user_id != user_id {
        return Err(Error::not_found("video", &video_id));
    }
    Ok(record)
}
