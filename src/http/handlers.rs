//! Security API handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::{NewSecurityEvent, SecurityEvent};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::monitor::{SecurityDashboard, SecurityEventQuery, SecurityMetrics};

const DEFAULT_RECENT_LIMIT: usize = 50;
const MAX_RECENT_LIMIT: usize = 1000;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub events: usize,
    pub webhooks: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        events: state.monitor.len(),
        webhooks: state.monitor.registry().len(),
    })
}

pub async fn ingest_event(
    State(state): State<AppState>,
    body: Result<Json<NewSecurityEvent>, axum::extract::rejection::JsonRejection>,
) -> Result<(StatusCode, Json<SecurityEvent>), ApiError> {
    let Json(new_event) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let event = state.monitor.record(new_event);
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn search_events(
    State(state): State<AppState>,
    query: Result<Query<SecurityEventQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<Vec<SecurityEvent>>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    Ok(Json(state.monitor.search(&query)))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

pub async fn recent_events(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Json<Vec<SecurityEvent>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
    Json(state.monitor.recent_events(limit))
}

pub async fn security_metrics(State(state): State<AppState>) -> Json<SecurityMetrics> {
    Json(state.monitor.metrics())
}

pub async fn security_dashboard(State(state): State<AppState>) -> Json<SecurityDashboard> {
    Json(state.monitor.dashboard())
}

/// Echo the security headers this server attaches, outside production only.
pub async fn headers_debug(State(state): State<AppState>, request_headers: HeaderMap) -> impl IntoResponse {
    if state.config.environment.is_production() {
        return ApiError::not_found().into_response();
    }

    let secure = state.config.listener.trust_forwarded_headers
        && request_headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|p| p.eq_ignore_ascii_case("https"));
    let applied = state
        .header_policy
        .headers_for("/api/security/headers-debug", secure);

    let mut headers = Map::new();
    for (name, value) in applied.iter() {
        let value = value.to_str().unwrap_or_default().to_string();
        headers.insert(name.as_str().to_string(), Value::String(value));
    }

    Json(serde_json::json!({
        "environment": state.config.environment.as_str(),
        "secure": secure,
        "headers": headers,
        "userAgent": request_headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
    }))
    .into_response()
}
