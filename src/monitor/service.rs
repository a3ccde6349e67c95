//! The security monitor handle.
//!
//! # Responsibilities
//! - Stamp, store and log incoming events
//! - Forward high and critical events to the reporter
//! - Hand events to the webhook dispatcher without blocking the caller
//! - Own the cleanup and anomaly background tasks
//!
//! # Design Decisions
//! - One mutex guards the store so append, eviction and counters are atomic
//! - Background fan-outs hold a semaphore permit; when none is free the event
//!   is still stored but its delivery is skipped
//! - Background tasks exist only between `start()` and `shutdown()`

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::MonitorConfig;
use crate::events::{EventType, NewSecurityEvent, SecurityEvent, Severity};
use crate::lifecycle::Shutdown;
use crate::monitor::anomaly::detect_anomalies;
use crate::monitor::query::{self, SecurityDashboard, SecurityEventQuery, SecurityMetrics};
use crate::monitor::reporter::Reporter;
use crate::monitor::store::EventStore;
use crate::observability::metrics;
use crate::webhooks::{DeliveryReport, WebhookDispatcher, WebhookRegistry};

/// Cheaply cloneable handle to the monitor.
#[derive(Clone)]
pub struct SecurityMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    store: Mutex<EventStore>,
    reporter: Arc<dyn Reporter>,
    dispatcher: WebhookDispatcher,
    dispatch_permits: Arc<Semaphore>,
    anomaly_alerts: Mutex<HashMap<String, DateTime<Utc>>>,
    shutdown: Shutdown,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SecurityMonitor {
    pub fn create(config: MonitorConfig, dispatcher: WebhookDispatcher, reporter: Arc<dyn Reporter>) -> Self {
        tracing::info!(
            capacity = config.capacity,
            retention_days = config.retention_days,
            webhooks = dispatcher.registry().len(),
            reporter = reporter.name(),
            "Security monitor created"
        );

        Self {
            inner: Arc::new(MonitorInner {
                store: Mutex::new(EventStore::new(config.capacity)),
                dispatch_permits: Arc::new(Semaphore::new(config.max_inflight_dispatches.max(1))),
                config,
                reporter,
                dispatcher,
                anomaly_alerts: Mutex::new(HashMap::new()),
                shutdown: Shutdown::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn registry(&self) -> &WebhookRegistry {
        self.inner.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.inner.dispatcher
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    fn store(&self) -> MutexGuard<'_, EventStore> {
        self.inner.store.lock().expect("event store mutex poisoned")
    }

    /// Record an event and dispatch it to webhooks in the background.
    pub fn record(&self, new_event: NewSecurityEvent) -> SecurityEvent {
        self.record_with_timestamp(new_event, Utc::now())
    }

    pub fn record_with_timestamp(&self, new_event: NewSecurityEvent, timestamp: DateTime<Utc>) -> SecurityEvent {
        let event = self.store_event(new_event, timestamp);
        self.spawn_dispatch(&event);
        event
    }

    /// Record an event and wait for webhook delivery to settle.
    pub async fn record_and_dispatch(&self, new_event: NewSecurityEvent) -> (SecurityEvent, Vec<DeliveryReport>) {
        let event = self.store_event(new_event, Utc::now());
        let reports = self.inner.dispatcher.send_event(&event).await;
        (event, reports)
    }

    fn store_event(&self, new_event: NewSecurityEvent, timestamp: DateTime<Utc>) -> SecurityEvent {
        let event = new_event.into_event(timestamp);

        let size = {
            let mut store = self.store();
            store.push(event.clone());
            store.len()
        };

        metrics::record_security_event(event.event_type.as_str(), event.severity.as_str());
        metrics::record_store_size(size);
        log_event(&event);

        if event.severity >= Severity::High {
            if let Err(e) = self.inner.reporter.report(&event) {
                tracing::warn!(event_id = %event.id, error = %e, "Security reporter failed");
            }
        }

        event
    }

    fn spawn_dispatch(&self, event: &SecurityEvent) {
        if self.inner.dispatcher.registry().is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(event_id = %event.id, "No runtime available, skipping webhook dispatch");
            return;
        };

        let Ok(permit) = self.inner.dispatch_permits.clone().try_acquire_owned() else {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                max_inflight = self.inner.config.max_inflight_dispatches,
                "Webhook dispatch saturated, skipping delivery"
            );
            metrics::record_dispatch_skipped();
            return;
        };

        let dispatcher = self.inner.dispatcher.clone();
        let event = event.clone();
        handle.spawn(async move {
            let _permit = permit;
            dispatcher.send_event(&event).await;
        });
    }

    /// Background fan-outs currently holding a dispatch permit.
    pub fn inflight_dispatches(&self) -> usize {
        self.inner.config.max_inflight_dispatches.max(1) - self.inner.dispatch_permits.available_permits()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn recent_events(&self, limit: usize) -> Vec<SecurityEvent> {
        query::recent(&self.store(), limit)
    }

    pub fn search(&self, query: &SecurityEventQuery) -> Vec<SecurityEvent> {
        query::search(&self.store(), query)
    }

    pub fn metrics(&self) -> SecurityMetrics {
        self.metrics_at(Utc::now())
    }

    pub fn metrics_at(&self, now: DateTime<Utc>) -> SecurityMetrics {
        query::metrics(&self.store(), now, self.inner.config.top_ip_limit)
    }

    pub fn dashboard(&self) -> SecurityDashboard {
        self.dashboard_at(Utc::now())
    }

    pub fn dashboard_at(&self, now: DateTime<Utc>) -> SecurityDashboard {
        query::dashboard(&self.store(), now, self.inner.config.top_ip_limit)
    }

    /// Drop events older than the retention window. Returns how many were removed.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(self.inner.config.retention_days);
        let (removed, remaining) = {
            let mut store = self.store();
            let removed = store.purge_before(cutoff);
            (removed, store.len())
        };

        metrics::record_store_size(remaining);
        if removed > 0 {
            tracing::info!(removed, remaining, cutoff = %cutoff, "Expired security events purged");
        }
        removed
    }

    /// Record a `SUSPICIOUS_ACTIVITY` event for every IP over the anomaly threshold.
    pub fn check_anomalies(&self, now: DateTime<Utc>) -> Vec<SecurityEvent> {
        let window = Duration::seconds(self.inner.config.anomaly_window_secs);
        let anomalies = {
            let store = self.store();
            let mut alerts = self.inner.anomaly_alerts.lock().expect("anomaly alert mutex poisoned");
            detect_anomalies(&store, now, window, self.inner.config.anomaly_threshold, &mut alerts)
        };

        anomalies
            .into_iter()
            .map(|anomaly| {
                let new_event = NewSecurityEvent::new(
                    EventType::SuspiciousActivity,
                    format!(
                        "{} security events from {} in the last {} minutes",
                        anomaly.count,
                        anomaly.ip,
                        window.num_minutes()
                    ),
                )
                .ip(anomaly.ip.clone())
                .metadata(json!({
                    "count": anomaly.count,
                    "threshold": self.inner.config.anomaly_threshold,
                    "windowStart": anomaly.window_start,
                }));
                self.record_with_timestamp(new_event, now)
            })
            .collect()
    }

    /// Spawn the cleanup and anomaly tasks. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock().expect("monitor task mutex poisoned");
        if !tasks.is_empty() {
            tracing::warn!("Security monitor already started");
            return;
        }

        let cleanup_every = std::time::Duration::from_secs(self.inner.config.cleanup_interval_secs.max(1));
        let anomaly_every = std::time::Duration::from_secs(self.inner.config.anomaly_interval_secs.max(1));

        tasks.push(self.spawn_periodic("cleanup", cleanup_every, |monitor| {
            monitor.cleanup(Utc::now());
        }));
        tasks.push(self.spawn_periodic("anomaly-check", anomaly_every, |monitor| {
            monitor.check_anomalies(Utc::now());
        }));

        tracing::info!(
            cleanup_interval_secs = cleanup_every.as_secs(),
            anomaly_interval_secs = anomaly_every.as_secs(),
            "Security monitor background tasks started"
        );
    }

    fn spawn_periodic<F>(&self, name: &'static str, period: std::time::Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(&SecurityMonitor) + Send + 'static,
    {
        let monitor = self.clone();
        let mut shutdown = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick(&monitor),
                    _ = shutdown.recv() => {
                        tracing::debug!(task = name, "Monitor task received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    /// Stop background tasks and wait for them to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.trigger();

        let tasks: Vec<_> = {
            let mut guard = self.inner.tasks.lock().expect("monitor task mutex poisoned");
            guard.drain(..).collect()
        };

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Monitor task ended abnormally");
            }
        }
        tracing::info!("Security monitor stopped");
    }

    pub fn running_tasks(&self) -> usize {
        self.inner.tasks.lock().expect("monitor task mutex poisoned").len()
    }
}

fn log_event(event: &SecurityEvent) {
    let ip = event.ip.as_deref().unwrap_or("-");
    let path = event.path.as_deref().unwrap_or("-");
    if event.severity >= Severity::High {
        tracing::warn!(
            target: "security",
            event_id = %event.id,
            event_type = %event.event_type,
            severity = %event.severity,
            ip,
            path,
            "{}",
            event.message
        );
    } else {
        tracing::info!(
            target: "security",
            event_id = %event.id,
            event_type = %event.event_type,
            severity = %event.severity,
            ip,
            path,
            "{}",
            event.message
        );
    }
}
