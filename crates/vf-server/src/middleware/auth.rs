//! Session authentication.
//!
//! Sessions are issued out of band (`vidforge issue-session`); this layer
//! only resolves the `token` cookie to a [`UserId`] and inserts it into the
//! request extensions.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use vf_core::UserId;

use crate::context::AppContext;
use crate::error::AppError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Find the session token in a `Cookie` header value.
pub fn session_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Reject requests without a valid session with 401.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = request
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_token)
        .map(str::to_owned);

    let Some(token) = token else {
        return Err(unauthorized("Authentication required"));
    };

    match ctx.store.user_for_token(&token) {
        Ok(Some(user_id)) => {
            request.extensions_mut().insert::<UserId>(user_id);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(unauthorized("Unknown or expired session")),
        Err(e) => Err(AppError::from(e).into_response()),
    }
}

fn unauthorized(message: &str) -> Response {
    AppError::from(vf_core::Error::Unauthorized(message.into())).into_response()
}
