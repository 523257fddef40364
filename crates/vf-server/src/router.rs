//! Route table.

use std::path::PathBuf;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes::{assets, health, videos};

/// Routes that need a session.
fn authenticated(ctx: &AppContext) -> Router<AppContext> {
    Router::new()
        .route("/api/videos", get(videos::list_videos))
        .route("/api/upload-video", post(videos::upload_video))
        .route("/api/video/extract-audio", patch(videos::extract_audio))
        .route("/api/video/resize", put(videos::resize_video))
        .route("/get-video-asset", get(assets::get_video_asset))
        .route_layer(from_fn_with_state(ctx.clone(), auth_middleware))
}

/// Build the HTTP application. `static_dir`, when it exists, serves the web
/// client with `index.html` as the fallback page.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/health", get(health::health_check))
        .merge(authenticated(&ctx))
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    match static_dir.filter(|dir| dir.is_dir()) {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Serving web client");
            let index = dir.join("index.html");
            app.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)))
        }
        None => app,
    }
}
