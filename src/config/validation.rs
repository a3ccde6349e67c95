//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities > 0, timeouts > 0, addresses parse)
//! - Refuse to expose the admin API with the placeholder key
//! - Require a security API key unless authentication is explicitly off
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SentinelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{SentinelConfig, WebhookConfig, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &SentinelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    if config.monitor.capacity == 0 {
        errors.push(ValidationError::new("monitor.capacity", "must be greater than 0"));
    }
    if config.monitor.retention_days <= 0 {
        errors.push(ValidationError::new("monitor.retention_days", "must be greater than 0"));
    }
    if config.monitor.cleanup_interval_secs == 0 {
        errors.push(ValidationError::new("monitor.cleanup_interval_secs", "must be greater than 0"));
    }
    if config.monitor.anomaly_interval_secs == 0 {
        errors.push(ValidationError::new("monitor.anomaly_interval_secs", "must be greater than 0"));
    }
    if config.monitor.anomaly_window_secs <= 0 {
        errors.push(ValidationError::new("monitor.anomaly_window_secs", "must be greater than 0"));
    }

    if config.monitor.max_inflight_dispatches == 0 {
        errors.push(ValidationError::new("monitor.max_inflight_dispatches", "must be greater than 0"));
    }

    for entry in &config.webhooks {
        if entry.name.trim().is_empty() {
            errors.push(ValidationError::new("webhooks.name", "must not be empty"));
        }
        errors.extend(validate_webhook(&format!("webhooks.{}", entry.name), &entry.config));
    }

    let limits = &config.limits;
    if limits.enabled {
        let checks = [
            ("limits.max_url_length", limits.max_url_length),
            ("limits.max_query_params", limits.max_query_params),
            ("limits.max_headers", limits.max_headers),
            ("limits.max_header_size", limits.max_header_size),
            ("limits.max_body_size", limits.max_body_size),
            ("limits.max_json_depth", limits.max_json_depth),
            ("limits.max_array_length", limits.max_array_length),
        ];
        for (field, value) in checks {
            if value == 0 {
                errors.push(ValidationError::new(field, "must be greater than 0"));
            }
        }
    }

    if config.rate_limit.enabled && config.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new("rate_limit.requests_per_second", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if config.api.auth_required && config.api.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "api.api_key",
            "must be set unless api.auth_required is false",
        ));
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY)
    {
        errors.push(ValidationError::new("admin.api_key", "must be set when the admin API is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks for a single webhook, shared by startup validation and the admin API.
pub fn validate_webhook(prefix: &str, webhook: &WebhookConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let url = webhook.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ValidationError::new(format!("{}.url", prefix), "must be an http(s) URL"));
    }
    if webhook.secret.is_empty() {
        errors.push(ValidationError::new(format!("{}.secret", prefix), "must not be empty"));
    }
    if webhook.retry.max_attempts == 0 {
        errors.push(ValidationError::new(format!("{}.retry.maxAttempts", prefix), "must be at least 1"));
    }
    if webhook.timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{}.timeoutMs", prefix), "must be greater than 0"));
    }

    errors
}
