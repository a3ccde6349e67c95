use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::http::error::ApiError;
use crate::http::server::AppState;

/// Constant-time check of `Authorization: Bearer <expected>`.
///
/// An empty expected key never matches.
pub fn bearer_matches(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|key| bool::from(key.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false)
}

/// Require `Authorization: Bearer <admin api key>`.
pub async fn admin_auth_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    if bearer_matches(request.headers(), &state.config.admin.api_key) {
        return next.run(request).await;
    }
    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    ApiError::unauthorized().into_response()
}

/// Require `Authorization: Bearer <api key>` on the security API.
pub async fn api_auth_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    if bearer_matches(request.headers(), &state.config.api.api_key) {
        return next.run(request).await;
    }
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "Rejected unauthenticated security API request"
    );
    ApiError::unauthorized().into_response()
}
