//! Metrics collection and exposition.
//!
//! # Metrics
//! - `security_events_total` (counter): recorded events by type, severity
//! - `security_event_store_size` (gauge): events currently held in memory
//! - `webhook_deliveries_total` (counter): deliveries by webhook, outcome
//! - `webhook_delivery_attempts_total` (counter): HTTP attempts by webhook
//! - `request_guard_rejections_total` (counter): guard rejections by reason
//! - `http_requests_total` / `http_request_duration_seconds`: API traffic
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users and
//!   tests pay nothing
//! - Prometheus exporter runs on its own listener

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_security_event(event_type: &'static str, severity: &'static str) {
    metrics::counter!("security_events_total", "type" => event_type, "severity" => severity).increment(1);
}

pub fn record_store_size(size: usize) {
    metrics::gauge!("security_event_store_size").set(size as f64);
}

pub fn record_webhook_delivery(webhook: &str, delivered: bool, attempts: u32) {
    let outcome = if delivered { "delivered" } else { "failed" };
    metrics::counter!("webhook_deliveries_total", "webhook" => webhook.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::counter!("webhook_delivery_attempts_total", "webhook" => webhook.to_string())
        .increment(attempts as u64);
}

pub fn record_dispatch_skipped() {
    metrics::counter!("webhook_dispatch_skipped_total").increment(1);
}

pub fn record_guard_rejection(reason: &'static str) {
    metrics::counter!("request_guard_rejections_total", "reason" => reason).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!("http_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}
