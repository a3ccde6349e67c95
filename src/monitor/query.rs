//! Read-side filters and rollups over the event store.
//!
//! Every query returns events newest first. Search predicates are ANDed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::events::{EventType, SecurityEvent, Severity};
use crate::monitor::store::{hour_bucket, EventStore};

pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const MAX_SEARCH_LIMIT: usize = 1000;
const DASHBOARD_RECENT: usize = 20;
const DASHBOARD_CRITICAL: usize = 10;
const DASHBOARD_TOP_TYPES: usize = 5;
const TIMELINE_HOURS: i64 = 24;

/// Search filters. Absent fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventQuery {
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub tenant_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl SecurityEventQuery {
    pub fn matches(&self, event: &SecurityEvent) -> bool {
        if self.severity.is_some_and(|s| event.severity != s) {
            return false;
        }
        if self.event_type.is_some_and(|t| event.event_type != t) {
            return false;
        }
        if !matches_opt(&self.user_id, &event.user_id)
            || !matches_opt(&self.ip, &event.ip)
            || !matches_opt(&self.tenant_id, &event.tenant_id)
        {
            return false;
        }
        if self.start_date.is_some_and(|start| event.timestamp < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| event.timestamp > end) {
            return false;
        }
        true
    }

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
    }
}

fn matches_opt(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        Some(w) => actual.as_deref() == Some(w.as_str()),
        None => true,
    }
}

/// Sort by timestamp descending. Input is expected in reverse insertion
/// order so that equal timestamps keep the most recently recorded first.
fn newest_first(mut events: Vec<SecurityEvent>) -> Vec<SecurityEvent> {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

pub fn search(store: &EventStore, query: &SecurityEventQuery) -> Vec<SecurityEvent> {
    let matched: Vec<_> = store.iter().rev().filter(|e| query.matches(e)).cloned().collect();
    let mut sorted = newest_first(matched);
    sorted.truncate(query.effective_limit());
    sorted
}

pub fn recent(store: &EventStore, limit: usize) -> Vec<SecurityEvent> {
    let mut sorted = newest_first(store.iter().rev().cloned().collect());
    sorted.truncate(limit);
    sorted
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCount {
    pub ip: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    /// Events currently held in memory.
    pub total_events: usize,
    /// Events recorded since process start (including evicted ones).
    pub total_recorded: u64,
    pub events_last_hour: usize,
    pub events_last_24h: usize,
    /// Severity breakdown over the last 24 hours.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Lifetime counts per type.
    pub by_type: BTreeMap<EventType, u64>,
    /// Most active IPs over the last 24 hours, ignoring low severity events.
    pub top_ips: Vec<IpCount>,
    pub generated_at: DateTime<Utc>,
}

pub fn metrics(store: &EventStore, now: DateTime<Utc>, top_ip_limit: usize) -> SecurityMetrics {
    let hour_ago = now - Duration::hours(1);
    let day_ago = now - Duration::hours(24);

    let mut events_last_hour = 0;
    let mut events_last_24h = 0;
    let mut by_severity: BTreeMap<Severity, usize> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut ip_counts: HashMap<&str, usize> = HashMap::new();

    for event in store.iter().filter(|e| e.timestamp >= day_ago) {
        events_last_24h += 1;
        if event.timestamp >= hour_ago {
            events_last_hour += 1;
        }
        *by_severity.entry(event.severity).or_insert(0) += 1;

        if event.severity > Severity::Low {
            if let Some(ip) = event.ip.as_deref() {
                *ip_counts.entry(ip).or_insert(0) += 1;
            }
        }
    }

    let mut top_ips: Vec<IpCount> = ip_counts
        .into_iter()
        .map(|(ip, count)| IpCount {
            ip: ip.to_string(),
            count,
        })
        .collect();
    top_ips.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ip.cmp(&b.ip)));
    top_ips.truncate(top_ip_limit);

    let by_type: BTreeMap<EventType, u64> = store.type_counts().iter().map(|(t, c)| (*t, *c)).collect();

    SecurityMetrics {
        total_events: store.len(),
        total_recorded: by_type.values().sum(),
        events_last_hour,
        events_last_24h,
        by_severity,
        by_type,
        top_ips,
        generated_at: now,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    pub hour: DateTime<Utc>,
    pub total: u64,
    pub by_type: BTreeMap<EventType, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDashboard {
    pub metrics: SecurityMetrics,
    pub recent_events: Vec<SecurityEvent>,
    pub critical_events: Vec<SecurityEvent>,
    /// One bucket per hour for the last 24 hours, oldest first.
    pub timeline: Vec<TimelineBucket>,
    pub top_event_types: Vec<TypeCount>,
}

pub fn dashboard(store: &EventStore, now: DateTime<Utc>, top_ip_limit: usize) -> SecurityDashboard {
    let recent_events = recent(store, DASHBOARD_RECENT);

    let mut critical_events = newest_first(
        store
            .iter()
            .rev()
            .filter(|e| e.severity >= Severity::High)
            .cloned()
            .collect(),
    );
    critical_events.truncate(DASHBOARD_CRITICAL);

    let current = hour_bucket(now);
    let mut type_totals: HashMap<EventType, u64> = HashMap::new();
    let timeline: Vec<TimelineBucket> = (0..TIMELINE_HOURS)
        .rev()
        .map(|hours_back| {
            let hour = current - Duration::hours(hours_back);
            let by_type: BTreeMap<EventType, u64> = store
                .hourly_counts()
                .get(&hour)
                .map(|counts| counts.iter().map(|(t, c)| (*t, *c)).collect())
                .unwrap_or_default();
            for (t, c) in &by_type {
                *type_totals.entry(*t).or_insert(0) += c;
            }
            TimelineBucket {
                hour,
                total: by_type.values().sum(),
                by_type,
            }
        })
        .collect();

    let mut top_event_types: Vec<TypeCount> = type_totals
        .into_iter()
        .map(|(event_type, count)| TypeCount { event_type, count })
        .collect();
    top_event_types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.event_type.cmp(&b.event_type)));
    top_event_types.truncate(DASHBOARD_TOP_TYPES);

    SecurityDashboard {
        metrics: metrics(store, now, top_ip_limit),
        recent_events,
        critical_events,
        timeline,
        top_event_types,
    }
}
