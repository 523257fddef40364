use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::context::AppContext;

/// GET /health
///
/// The coordinator reports its queue depth. A frontend pings the coordinator
/// and answers 503 when it cannot reach it, since no job could be accepted.
pub async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    let dispatch = ctx.transcoder.dispatcher().ping().await;
    let status = if dispatch.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if dispatch.is_ok() { "ok" } else { "degraded" },
        "role": ctx.role.to_string(),
        "version": env!("CARGO_PKG_VERSION"),
        "queue_depth": ctx.queue.as_ref().map(|q| q.len()),
        "dispatch": match &dispatch {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        },
    });

    (status, Json(body))
}
