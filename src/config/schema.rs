//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::{EventType, Severity};

/// Root configuration for the security sentinel.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SentinelConfig {
    /// Listener configuration (bind address, proxy trust).
    pub listener: ListenerConfig,

    /// Deployment environment (controls HSTS, debug endpoints, log format).
    pub environment: Environment,

    /// Event store and background sweep settings.
    pub monitor: MonitorConfig,

    /// Statically configured webhooks.
    pub webhooks: Vec<WebhookEntry>,

    /// Request size/shape limits.
    pub limits: LimitsConfig,

    /// Security response headers.
    pub headers: HeadersConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Security API (event ingest and queries) settings.
    pub api: ApiConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Trust X-Forwarded-For / X-Forwarded-Proto from an upstream TLS terminator.
    pub trust_forwarded_headers: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded_headers: false,
        }
    }
}

/// Event store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Maximum number of events held in memory.
    pub capacity: usize,

    /// Events older than this are swept by the cleanup task.
    pub retention_days: i64,

    /// Cleanup sweep interval in seconds.
    pub cleanup_interval_secs: u64,

    /// Anomaly check interval in seconds.
    pub anomaly_interval_secs: u64,

    /// Sliding window the anomaly check looks back over, in seconds.
    pub anomaly_window_secs: i64,

    /// Events per IP within the window that trigger a SUSPICIOUS_ACTIVITY event.
    pub anomaly_threshold: usize,

    /// Number of entries in the "top offending IPs" ranking.
    pub top_ip_limit: usize,

    /// Webhook fan-outs allowed in flight from `record()`; further events skip delivery.
    pub max_inflight_dispatches: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            retention_days: 30,
            cleanup_interval_secs: 3600,
            anomaly_interval_secs: 300,
            anomaly_window_secs: 900,
            anomaly_threshold: 20,
            top_ip_limit: 10,
            max_inflight_dispatches: 64,
        }
    }
}

/// A webhook registered under an operator-chosen id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEntry {
    /// Registry id.
    pub name: String,

    #[serde(flatten)]
    pub config: WebhookConfig,
}

/// Delivery target for security events.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Endpoint receiving the signed POST.
    pub url: String,

    /// Shared HMAC secret.
    pub secret: String,

    /// Allow-list of event types; empty means every type.
    #[serde(default)]
    pub events: Vec<EventType>,

    /// Minimum severity delivered to this endpoint.
    #[serde(default)]
    pub min_severity: Option<Severity>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

impl WebhookConfig {
    /// Create an enabled webhook with default retry policy and timeout.
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: secret.into(),
            events: Vec::new(),
            min_severity: None,
            enabled: true,
            retry: RetryPolicy::default(),
            timeout_ms: default_webhook_timeout_ms(),
        }
    }
}

// The secret must never end up in logs.
impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .field("events", &self.events)
            .field("min_severity", &self.min_severity)
            .field("enabled", &self.enabled)
            .field("retry", &self.retry)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

/// Retry policy for webhook delivery.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds (delay = backoff_ms * attempt).
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

/// Request size and shape limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub enabled: bool,
    pub max_url_length: usize,
    pub max_query_params: usize,
    pub max_headers: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,
    pub max_json_depth: usize,
    pub max_array_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_url_length: 2048,
            max_query_params: 100,
            max_headers: 100,
            max_header_size: 8192,
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_json_depth: 10,
            max_array_length: 1000,
        }
    }
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Enable security headers.
    pub enabled: bool,

    /// HSTS max-age in seconds (production + secure requests only).
    pub hsts_max_age_secs: u64,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hsts_max_age_secs: 31_536_000,
        }
    }
}

/// Response compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Require `Authorization: Bearer <api_key>` on `/api/security/*`.
    pub auth_required: bool,

    /// Key presented by event producers and dashboard readers.
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_required: true,
            api_key: String::new(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}
