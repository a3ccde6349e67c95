//! Per-IP burst detection.
//!
//! Counts events of severity medium or higher per IP inside a sliding window.
//! IPs at or above the threshold are reported once per window; the caller
//! records the resulting `SUSPICIOUS_ACTIVITY` events.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::events::{EventType, Severity};
use crate::monitor::store::EventStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub ip: String,
    pub count: usize,
    pub window_start: DateTime<Utc>,
}

/// Scan the store for IPs over `threshold` in `[now - window, now]`.
///
/// `last_alerts` holds the time each IP was last flagged; an IP flagged inside
/// the current window is skipped and stale entries are dropped.
pub fn detect_anomalies(
    store: &EventStore,
    now: DateTime<Utc>,
    window: Duration,
    threshold: usize,
    last_alerts: &mut HashMap<String, DateTime<Utc>>,
) -> Vec<Anomaly> {
    let window_start = now - window;
    last_alerts.retain(|_, flagged_at| *flagged_at >= window_start);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in store.iter().rev() {
        if event.timestamp < window_start {
            break;
        }
        if event.severity < Severity::Medium || event.event_type == EventType::SuspiciousActivity {
            continue;
        }
        if let Some(ip) = event.ip.as_deref() {
            *counts.entry(ip).or_insert(0) += 1;
        }
    }

    let mut anomalies: Vec<Anomaly> = counts
        .into_iter()
        .filter(|(ip, count)| *count >= threshold.max(1) && !last_alerts.contains_key(*ip))
        .map(|(ip, count)| Anomaly {
            ip: ip.to_string(),
            count,
            window_start,
        })
        .collect();
    anomalies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ip.cmp(&b.ip)));

    for anomaly in &anomalies {
        last_alerts.insert(anomaly.ip.clone(), now);
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NewSecurityEvent;

    fn fill(store: &mut EventStore, t: EventType, ip: &str, n: usize, ts: DateTime<Utc>) {
        for _ in 0..n {
            store.push(NewSecurityEvent::new(t, "x").ip(ip).into_event(ts));
        }
    }

    #[test]
    fn test_flags_ip_over_threshold_once_per_window() {
        let now = Utc::now();
        let mut store = EventStore::new(1000);
        fill(&mut store, EventType::LoginFailed, "1.1.1.1", 25, now - Duration::minutes(2));
        fill(&mut store, EventType::LoginFailed, "2.2.2.2", 5, now - Duration::minutes(2));

        let mut alerts = HashMap::new();
        let found = detect_anomalies(&store, now, Duration::minutes(15), 20, &mut alerts);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, "1.1.1.1");
        assert_eq!(found[0].count, 25);

        let again = detect_anomalies(&store, now + Duration::minutes(1), Duration::minutes(15), 20, &mut alerts);
        assert!(again.is_empty());
    }

    #[test]
    fn test_ignores_low_severity_old_and_suspicious_events() {
        let now = Utc::now();
        let mut store = EventStore::new(1000);
        fill(&mut store, EventType::LoginFailed, "1.1.1.1", 30, now - Duration::hours(2));
        fill(&mut store, EventType::LoginSuccess, "1.1.1.1", 30, now);
        fill(&mut store, EventType::SuspiciousActivity, "1.1.1.1", 30, now);

        let mut alerts = HashMap::new();
        assert!(detect_anomalies(&store, now, Duration::minutes(15), 20, &mut alerts).is_empty());
    }

    #[test]
    fn test_flags_again_after_window_expires() {
        let now = Utc::now();
        let mut store = EventStore::new(1000);
        fill(&mut store, EventType::XssAttempt, "3.3.3.3", 20, now);

        let mut alerts = HashMap::new();
        alerts.insert("3.3.3.3".to_string(), now - Duration::minutes(30));
        let found = detect_anomalies(&store, now, Duration::minutes(15), 20, &mut alerts);
        assert_eq!(found.len(), 1);
        assert_eq!(alerts["3.3.3.3"], now);
    }
}
