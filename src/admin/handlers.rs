use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::config::validation::validate_webhook;
use crate::config::{RetryPolicy, WebhookConfig};
use crate::events::{EventType, NewSecurityEvent, Severity};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::webhooks::DeliveryReport;

/// Registration as shown to operators. The secret is never returned.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    pub events: Vec<EventType>,
    pub min_severity: Option<Severity>,
    pub retry: RetryPolicy,
    pub timeout_ms: u64,
}

impl WebhookSummary {
    fn new(id: String, config: &WebhookConfig) -> Self {
        Self {
            id,
            url: config.url.clone(),
            enabled: config.enabled,
            events: config.events.clone(),
            min_severity: config.min_severity,
            retry: config.retry,
            timeout_ms: config.timeout_ms,
        }
    }
}

pub async fn list_webhooks(State(state): State<AppState>) -> Json<Vec<WebhookSummary>> {
    let webhooks = state
        .monitor
        .registry()
        .list()
        .into_iter()
        .map(|(id, config)| WebhookSummary::new(id, &config))
        .collect();
    Json(webhooks)
}

pub async fn put_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<WebhookConfig>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(config) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let errors = validate_webhook(&format!("webhooks.{id}"), &config);
    if !errors.is_empty() {
        let message = errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
        tracing::warn!(webhook = %id, errors = %message, "Rejected webhook registration");
        return Err(ApiError::bad_request(message));
    }

    let summary = WebhookSummary::new(id.clone(), &config);
    let replaced = state.monitor.registry().add(id, config).is_some();

    let status = if replaced { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(summary)))
}

pub async fn delete_webhook(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    match state.monitor.registry().remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found().with_message(format!("webhook `{id}` is not registered"))),
    }
}

/// Deliver a synthetic event to one webhook, ignoring its filter.
pub async fn test_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let config = state
        .monitor
        .registry()
        .get(&id)
        .ok_or_else(|| ApiError::not_found().with_message(format!("webhook `{id}` is not registered")))?;

    let event = NewSecurityEvent::new(EventType::SuspiciousActivity, "Webhook test event")
        .metadata(json!({ "test": true }))
        .into_event(Utc::now());

    tracing::info!(webhook = %id, event_id = %event.id, "Sending webhook test event");
    let report = state.monitor.dispatcher().deliver(&id, &config, &event).await;
    Ok(Json(report))
}
