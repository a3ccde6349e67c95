//! Concurrent, signed webhook delivery.
//!
//! # Responsibilities
//! - Select webhooks whose filter accepts the event
//! - Build, sign and POST a fresh payload per attempt
//! - Enforce a per-attempt timeout and retry with linear backoff
//! - Swallow exhausted failures after logging them
//!
//! # Design Decisions
//! - All matching webhooks are delivered concurrently and joined all-settled
//! - `send_event` never fails; callers get one report per matched webhook

use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use futures_util::future::join_all;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::WebhookConfig;
use crate::events::SecurityEvent;
use crate::observability::metrics;
use crate::resilience::retry_with_backoff;
use crate::webhooks::payload::WebhookPayload;
use crate::webhooks::registry::WebhookRegistry;
use crate::webhooks::signature::{sign, SIGNATURE_HEADER};

pub const WEBHOOK_ID_HEADER: &str = "x-webhook-id";
pub const WEBHOOK_ATTEMPT_HEADER: &str = "x-webhook-attempt";
pub const WEBHOOK_USER_AGENT: &str = concat!("security-sentinel-webhooks/", env!("CARGO_PKG_VERSION"));

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("endpoint returned status {0}")]
    Status(u16),

    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of delivering one event to one webhook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub webhook_id: String,
    pub delivered: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Delivers security events to registered webhooks.
#[derive(Clone)]
pub struct WebhookDispatcher {
    registry: WebhookRegistry,
    client: reqwest::Client,
    environment: String,
}

impl WebhookDispatcher {
    pub fn new(registry: WebhookRegistry, environment: impl Into<String>) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
            environment: environment.into(),
        }
    }

    pub fn registry(&self) -> &WebhookRegistry {
        &self.registry
    }

    /// Deliver an event to every matching webhook and wait for all of them.
    pub async fn send_event(&self, event: &SecurityEvent) -> Vec<DeliveryReport> {
        let targets = self.registry.matching(event);
        if targets.is_empty() {
            return Vec::new();
        }

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            webhooks = targets.len(),
            "Dispatching security event"
        );

        let deliveries = targets
            .iter()
            .map(|(id, config)| self.deliver(id, config, event));

        join_all(deliveries).await
    }

    /// Deliver an event to a single webhook, bypassing its filter.
    pub async fn deliver(&self, id: &str, config: &WebhookConfig, event: &SecurityEvent) -> DeliveryReport {
        let outcome = retry_with_backoff(config.retry, id, move |attempt| {
            self.attempt(id, config, event, attempt)
        })
        .await;

        let delivered = outcome.result.is_ok();
        metrics::record_webhook_delivery(id, delivered, outcome.attempts);

        match outcome.result {
            Ok(()) => {
                tracing::debug!(webhook = %id, event_id = %event.id, attempts = outcome.attempts, "Webhook delivered");
                DeliveryReport {
                    webhook_id: id.to_string(),
                    delivered: true,
                    attempts: outcome.attempts,
                    last_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    webhook = %id,
                    event_id = %event.id,
                    attempts = outcome.attempts,
                    error = %e,
                    "Webhook delivery failed, dropping event"
                );
                DeliveryReport {
                    webhook_id: id.to_string(),
                    delivered: false,
                    attempts: outcome.attempts,
                    last_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn attempt(
        &self,
        id: &str,
        config: &WebhookConfig,
        event: &SecurityEvent,
        attempt: u32,
    ) -> Result<(), DeliveryError> {
        let payload = WebhookPayload::new(event, id, &self.environment);
        let body = serde_json::to_vec(&payload)?;
        let signature = sign(&body, &config.secret);

        let request = self
            .client
            .post(&config.url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, WEBHOOK_USER_AGENT)
            .header(SIGNATURE_HEADER, signature)
            .header(WEBHOOK_ID_HEADER, id)
            .header(WEBHOOK_ATTEMPT_HEADER, attempt.to_string())
            .body(body);

        // Dropping the send future on timeout cancels the in-flight request.
        let response = match tokio::time::timeout(Duration::from_millis(config.timeout_ms), request.send()).await {
            Ok(result) => result?,
            Err(_) => return Err(DeliveryError::Timeout(config.timeout_ms)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventType, NewSecurityEvent};
    use chrono::Utc;

    #[tokio::test]
    async fn test_no_matching_webhooks() {
        let dispatcher = WebhookDispatcher::new(WebhookRegistry::new(), "test");
        let event = NewSecurityEvent::new(EventType::LoginFailed, "x").into_event(Utc::now());
        assert!(dispatcher.send_event(&event).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_swallowed() {
        let registry = WebhookRegistry::new();
        let mut config = WebhookConfig::new("http://127.0.0.1:9/hook", "s");
        config.retry.max_attempts = 2;
        config.retry.backoff_ms = 1;
        config.timeout_ms = 500;
        registry.add("dead", config);

        let dispatcher = WebhookDispatcher::new(registry, "test");
        let event = NewSecurityEvent::new(EventType::LoginFailed, "x").into_event(Utc::now());
        let reports = dispatcher.send_event(&event).await;

        assert_eq!(reports.len(), 1);
        assert!(!reports[0].delivered);
        assert_eq!(reports[0].attempts, 2);
        assert!(reports[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_malformed_url_fails_on_delivery() {
        let registry = WebhookRegistry::new();
        let mut config = WebhookConfig::new("not a url", "s");
        config.retry.max_attempts = 1;
        registry.add("bad", config);

        let dispatcher = WebhookDispatcher::new(registry, "test");
        let event = NewSecurityEvent::new(EventType::XssAttempt, "x").into_event(Utc::now());
        let reports = dispatcher.send_event(&event).await;

        assert_eq!(reports.len(), 1);
        assert!(!reports[0].delivered);
        assert_eq!(reports[0].attempts, 1);
    }
}
