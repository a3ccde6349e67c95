//! Bounded in-memory event buffer with per-type counters.
//!
//! Events are appended in arrival order, so the buffer is timestamp-ordered
//! and both capacity eviction and retention cleanup pop from the head.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::events::{EventType, SecurityEvent};

/// Truncate a timestamp to the start of its UTC hour.
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(3600), 0).unwrap_or(ts)
}

pub struct EventStore {
    events: VecDeque<SecurityEvent>,
    capacity: usize,
    /// Lifetime counts per type; eviction does not decrement them.
    type_counts: HashMap<EventType, u64>,
    /// Counts per type keyed by UTC hour.
    hourly_counts: BTreeMap<DateTime<Utc>, HashMap<EventType, u64>>,
}

impl EventStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            type_counts: HashMap::new(),
            hourly_counts: BTreeMap::new(),
        }
    }

    /// Append an event, evicting the oldest one if the buffer is full.
    pub fn push(&mut self, event: SecurityEvent) -> Option<SecurityEvent> {
        *self.type_counts.entry(event.event_type).or_insert(0) += 1;
        *self
            .hourly_counts
            .entry(hour_bucket(event.timestamp))
            .or_default()
            .entry(event.event_type)
            .or_insert(0) += 1;

        self.events.push_back(event);
        if self.events.len() > self.capacity {
            self.events.pop_front()
        } else {
            None
        }
    }

    /// Drop events older than `cutoff` from the head and prune stale hourly buckets.
    pub fn purge_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while self.events.front().is_some_and(|e| e.timestamp < cutoff) {
            self.events.pop_front();
            removed += 1;
        }

        let oldest_bucket = hour_bucket(cutoff);
        self.hourly_counts = self.hourly_counts.split_off(&oldest_bucket);

        removed
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SecurityEvent> {
        self.events.iter()
    }

    pub fn type_counts(&self) -> &HashMap<EventType, u64> {
        &self.type_counts
    }

    pub fn hourly_counts(&self) -> &BTreeMap<DateTime<Utc>, HashMap<EventType, u64>> {
        &self.hourly_counts
    }
}
