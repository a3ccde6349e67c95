//! Security event types and severity levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::events::classifier::classify;

/// Ordered severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Numeric rank used for threshold comparisons (low=1 .. critical=4).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Check if this severity meets a minimum threshold.
    pub fn meets(&self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Kinds of security-relevant occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Authentication
    LoginSuccess,
    LoginFailed,
    Logout,
    AccountLocked,
    BruteForceDetected,
    PasswordChanged,
    PasswordResetRequested,
    // Tokens and keys
    TokenRefreshed,
    InvalidToken,
    SessionExpired,
    ApiKeyCreated,
    ApiKeyRevoked,
    // Authorization
    UnauthorizedAccess,
    PermissionDenied,
    PrivilegeEscalationAttempt,
    TenantIsolationViolation,
    // Attacks and abuse
    SqlInjectionAttempt,
    XssAttempt,
    CsrfViolation,
    MaliciousFileUpload,
    InvalidWebhookSignature,
    RateLimitExceeded,
    RequestLimitExceeded,
    SuspiciousActivity,
}

impl EventType {
    pub const ALL: [EventType; 24] = [
        EventType::LoginSuccess,
        EventType::LoginFailed,
        EventType::Logout,
        EventType::AccountLocked,
        EventType::BruteForceDetected,
        EventType::PasswordChanged,
        EventType::PasswordResetRequested,
        EventType::TokenRefreshed,
        EventType::InvalidToken,
        EventType::SessionExpired,
        EventType::ApiKeyCreated,
        EventType::ApiKeyRevoked,
        EventType::UnauthorizedAccess,
        EventType::PermissionDenied,
        EventType::PrivilegeEscalationAttempt,
        EventType::TenantIsolationViolation,
        EventType::SqlInjectionAttempt,
        EventType::XssAttempt,
        EventType::CsrfViolation,
        EventType::MaliciousFileUpload,
        EventType::InvalidWebhookSignature,
        EventType::RateLimitExceeded,
        EventType::RequestLimitExceeded,
        EventType::SuspiciousActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::BruteForceDetected => "BRUTE_FORCE_DETECTED",
            Self::PasswordChanged => "PASSWORD_CHANGED",
            Self::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::ApiKeyCreated => "API_KEY_CREATED",
            Self::ApiKeyRevoked => "API_KEY_REVOKED",
            Self::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PrivilegeEscalationAttempt => "PRIVILEGE_ESCALATION_ATTEMPT",
            Self::TenantIsolationViolation => "TENANT_ISOLATION_VIOLATION",
            Self::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            Self::XssAttempt => "XSS_ATTEMPT",
            Self::CsrfViolation => "CSRF_VIOLATION",
            Self::MaliciousFileUpload => "MALICIOUS_FILE_UPLOAD",
            Self::InvalidWebhookSignature => "INVALID_WEBHOOK_SIGNATURE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::RequestLimitExceeded => "REQUEST_LIMIT_EXCEEDED",
            Self::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown event type: {}", s.trim()))
    }
}

/// Caller-supplied description of something that happened.
///
/// The monitor stamps id, timestamp and severity when it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecurityEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub message: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewSecurityEvent {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
            ip: None,
            user_agent: None,
            user_id: None,
            tenant_id: None,
            path: None,
            method: None,
            metadata: None,
        }
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.path = Some(path.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Stamp the event with an id, the given timestamp and its classified severity.
    pub fn into_event(self, timestamp: DateTime<Utc>) -> SecurityEvent {
        SecurityEvent {
            id: Uuid::new_v4(),
            event_type: self.event_type,
            severity: classify(self.event_type),
            timestamp,
            ip: self.ip,
            user_agent: self.user_agent,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            path: self.path,
            method: self.method,
            message: self.message,
            metadata: self.metadata,
        }
    }
}

/// A recorded security event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}
