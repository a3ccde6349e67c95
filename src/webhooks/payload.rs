//! Webhook wire payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::SecurityEvent;

pub const PAYLOAD_TYPE: &str = "security.event";

/// Body POSTed to a webhook. Built fresh for every delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub data: SecurityEvent,
    pub timestamp: DateTime<Utc>,
    pub webhook_id: String,
    pub environment: String,
}

impl WebhookPayload {
    pub fn new(event: &SecurityEvent, webhook_id: &str, environment: &str) -> Self {
        Self {
            payload_type: PAYLOAD_TYPE.to_string(),
            data: event.clone(),
            timestamp: Utc::now(),
            webhook_id: webhook_id.to_string(),
            environment: environment.to_string(),
        }
    }
}
