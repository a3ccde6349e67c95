//! Alert reporting for high and critical events.

use thiserror::Error;

use crate::events::SecurityEvent;

#[derive(Debug, Error)]
#[error("reporter `{reporter}` failed: {message}")]
pub struct ReporterError {
    pub reporter: &'static str,
    pub message: String,
}

/// Sink for events of severity high or above.
///
/// Called synchronously while recording, so implementations should hand work
/// off instead of blocking. Errors are logged by the monitor and dropped.
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;

    fn report(&self, event: &SecurityEvent) -> Result<(), ReporterError>;
}

/// Emits alerts as `tracing` events under the `security.alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn report(&self, event: &SecurityEvent) -> Result<(), ReporterError> {
        tracing::error!(
            target: "security.alert",
            event_id = %event.id,
            event_type = %event.event_type,
            severity = %event.severity,
            ip = event.ip.as_deref().unwrap_or("-"),
            tenant = event.tenant_id.as_deref().unwrap_or("-"),
            "{}",
            event.message
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn report(&self, _event: &SecurityEvent) -> Result<(), ReporterError> {
        Ok(())
    }
}
