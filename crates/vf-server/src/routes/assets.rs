//! Streaming downloads of originals and derived artifacts.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use vf_core::{Error, ResizeKey, UserId, VideoRecord};
use vf_storage::ArtifactPath;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::owned_video;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Thumbnail,
    Original,
    Audio,
    Resize,
}

#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub dimensions: Option<String>,
}

fn video_mime(extension: &str) -> &'static str {
    match extension {
        "mov" => "video/quicktime",
        _ => "video/mp4",
    }
}

/// Storage location, MIME type and download name (`None` for inline display).
///
/// Derived artifacts are only served once the record says they are complete;
/// a file at the deterministic path is not proof of that.
fn locate(record: &VideoRecord, query: &AssetQuery) -> Result<(ArtifactPath, &'static str, Option<String>), Error> {
    let id = &record.video_id;
    Ok(match query.asset_type {
        AssetType::Thumbnail => (ArtifactPath::thumbnail(id), "image/jpeg", None),
        AssetType::Audio if !record.extracted_audio => return Err(Error::not_found("audio track", id)),
        AssetType::Audio => (
            ArtifactPath::audio(id),
            "audio/aac",
            Some(format!("{}-audio.aac", record.name)),
        ),
        AssetType::Original => (
            ArtifactPath::original(id, &record.extension)?,
            video_mime(&record.extension),
            Some(format!("{}.{}", record.name, record.extension)),
        ),
        AssetType::Resize => {
            let raw = query
                .dimensions
                .as_deref()
                .ok_or_else(|| Error::Validation("dimensions are required for resize assets".into()))?;
            let key: ResizeKey = raw.parse()?;
            if !record.resize_state(&key).is_some_and(|state| state.done) {
                return Err(Error::not_found("rendition", format!("{id}/{key}")));
            }
            (
                ArtifactPath::resize(id, key, &record.extension)?,
                video_mime(&record.extension),
                Some(format!("{}-{key}.{}", record.name, record.extension)),
            )
        }
    })
}

/// GET /get-video-asset?videoId=&type=&dimensions=
pub async fn get_video_asset(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<AssetQuery>,
) -> Result<Response, AppError> {
    let record = owned_video(&ctx, user_id, &query.video_id)?;
    let (path, mime, download_name) = locate(&record, &query)?;
    let (source, len) = ctx.storage.read_stream(&path).await?;

    let mut response = Body::from_stream(ReaderStream::new(source)).into_response();
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let Some(name) = download_name {
        let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vf_core::{ResizeState, VideoId};

    fn record() -> VideoRecord {
        VideoRecord::new("0a1b2c3d".parse::<VideoId>().unwrap(), UserId::new(), "trip", "mov", None)
    }

    fn query(asset_type: AssetType, dimensions: Option<&str>) -> AssetQuery {
        AssetQuery {
            video_id: "0a1b2c3d".into(),
            asset_type,
            dimensions: dimensions.map(String::from),
        }
    }

    #[test]
    fn resize_asset_location() {
        let mut record = record();
        record.resizes.insert(ResizeKey::new(640, 480).unwrap(), ResizeState::DONE);
        let (path, mime, name) = locate(&record, &query(AssetType::Resize, Some("640x480"))).unwrap();
        assert_eq!(path.to_string(), "0a1b2c3d/640x480.mov");
        assert_eq!(mime, "video/quicktime");
        assert_eq!(name.as_deref(), Some("trip-640x480.mov"));
    }

    #[test]
    fn thumbnail_is_inline() {
        let (_, mime, name) = locate(&record(), &query(AssetType::Thumbnail, None)).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert!(name.is_none());
    }

    #[test]
    fn resize_requires_valid_dimensions() {
        assert!(locate(&record(), &query(AssetType::Resize, None)).is_err());
        assert!(locate(&record(), &query(AssetType::Resize, Some("../../x"))).is_err());
    }

    #[test]
    fn unfinished_artifacts_are_not_found() {
        let mut record = record();
        let key = ResizeKey::new(640, 480).unwrap();

        for state in [None, Some(ResizeState::PROCESSING), Some(ResizeState::FAILED)] {
            if let Some(state) = state {
                record.resizes.insert(key, state);
            }
            let err = locate(&record, &query(AssetType::Resize, Some("640x480"))).unwrap_err();
            assert!(err.is_not_found(), "{state:?}: {err}");
        }

        record.audio_processing = true;
        assert!(locate(&record, &query(AssetType::Audio, None)).unwrap_err().is_not_found());
        record.audio_processing = false;
        record.extracted_audio = true;
        assert!(locate(&record, &query(AssetType::Audio, None)).is_ok());
    }
}
