//! Static event type → severity classification.
//!
//! Anything not listed in one of the tables below is `Low`.

use crate::events::types::{EventType, Severity};

const CRITICAL_EVENTS: &[EventType] = &[
    EventType::SqlInjectionAttempt,
    EventType::PrivilegeEscalationAttempt,
    EventType::TenantIsolationViolation,
    EventType::BruteForceDetected,
];

const HIGH_EVENTS: &[EventType] = &[
    EventType::XssAttempt,
    EventType::CsrfViolation,
    EventType::UnauthorizedAccess,
    EventType::AccountLocked,
    EventType::SuspiciousActivity,
    EventType::InvalidWebhookSignature,
    EventType::MaliciousFileUpload,
];

const MEDIUM_EVENTS: &[EventType] = &[
    EventType::LoginFailed,
    EventType::RateLimitExceeded,
    EventType::PermissionDenied,
    EventType::InvalidToken,
    EventType::RequestLimitExceeded,
    EventType::PasswordResetRequested,
];

/// Map an event type to its severity.
pub fn classify(event_type: EventType) -> Severity {
    if CRITICAL_EVENTS.contains(&event_type) {
        Severity::Critical
    } else if HIGH_EVENTS.contains(&event_type) {
        Severity::High
    } else if MEDIUM_EVENTS.contains(&event_type) {
        Severity::Medium
    } else {
        Severity::Low
    }
}
