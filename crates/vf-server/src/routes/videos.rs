//! Video listing, upload and transcoding requests.

use std::path::Path;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use vf_core::{Error, UserId, VideoId, VideoRecord};
use vf_jobs::{Job, JobOutcome, RequestOutcome};
use vf_storage::ArtifactPath;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::owned_video;

/// GET /api/videos
pub async fn list_videos(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<VideoRecord>>, AppError> {
    Ok(Json(ctx.store.list_for_user(user_id)?))
}

/// Split the `filename` header into name and lowercase extension.
fn split_filename(headers: &HeaderMap) -> Result<(String, String), Error> {
    let raw = headers
        .get("filename")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Validation("missing filename header".into()))?;

    let path = Path::new(raw);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation(format!("invalid filename '{raw}'")))?;
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    Ok((name, extension))
}

/// POST /api/upload-video
///
/// Streams the raw body into storage, generates the thumbnail inline and
/// creates the record. Anything written is removed again on failure.
pub async fn upload_video(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let (name, extension) = split_filename(&headers)?;
    if !ctx.config.upload.accepts(&extension) {
        return Err(Error::Validation(format!(
            "Only these formats are allowed: {}",
            ctx.config.upload.formats.join(", ")
        ))
        .into());
    }

    let video_id = VideoId::new();
    match ingest(&ctx, user_id, &video_id, &name, &extension, body).await {
        Ok(record) => {
            tracing::info!(video_id = %video_id, user_id = %user_id, "Video uploaded");
            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "status": "success",
                    "message": "The file was uploaded successfully!",
                    "videoId": record.video_id,
                })),
            ))
        }
        Err(e) => {
            if let Err(cleanup) = ctx.storage.delete_video(&video_id).await {
                tracing::warn!(video_id = %video_id, error = %cleanup, "Failed to clean up upload");
            }
            Err(e.into())
        }
    }
}

async fn ingest(
    ctx: &AppContext,
    user_id: UserId,
    video_id: &VideoId,
    name: &str,
    extension: &str,
    body: Body,
) -> Result<VideoRecord, Error> {
    let original = ArtifactPath::original(video_id, extension)?;
    let mut sink = ctx.storage.write_stream(&original).await?;
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Validation(format!("upload interrupted: {e}")))?;
        sink.write_all(&chunk).await?;
    }
    sink.shutdown().await?;
    drop(sink);

    let dimensions = match ctx.executor.execute(&Job::thumbnail(video_id.clone(), extension)).await {
        JobOutcome::Success { dimensions } => dimensions,
        JobOutcome::Failure { reason } => return Err(Error::codec("thumbnail", reason)),
    };

    let record = VideoRecord::new(video_id.clone(), user_id, name, extension, dimensions);
    ctx.store.insert(&record)?;
    Ok(record)
}

#[derive(Debug, Deserialize)]
pub struct VideoIdQuery {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRequest {
    pub video_id: String,
    pub width: u32,
    pub height: u32,
}

fn request_response(outcome: RequestOutcome, accepted: &str) -> impl IntoResponse {
    match outcome {
        RequestOutcome::Accepted => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": accepted })),
        ),
        RequestOutcome::Rejected(reason) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": reason.message() })),
        ),
    }
}

/// PATCH /api/video/extract-audio?videoId=
pub async fn extract_audio(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<VideoIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let record = owned_video(&ctx, user_id, &query.video_id)?;
    let outcome = ctx.transcoder.request_audio_extraction(&record.video_id).await?;
    Ok(request_response(outcome, "The audio is now being extracted!"))
}

/// PUT /api/video/resize
pub async fn resize_video(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<ResizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = owned_video(&ctx, user_id, &payload.video_id)?;
    let outcome = ctx
        .transcoder
        .request_resize(&record.video_id, payload.width, payload.height)
        .await?;
    Ok(request_response(outcome, "The video is now being processed!"))
}
