//! Per-client rate limiting.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::events::{EventType, NewSecurityEvent};
use crate::http::error::ApiError;
use crate::monitor::SecurityMonitor;
use crate::observability::metrics;
use crate::security::client::{client_ip, user_agent};

/// Buckets idle this long are dropped when the table grows past `PRUNE_AT`.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(300);
const PRUNE_AT: usize = 10_000;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiterState {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    rps: f64,
    burst: f64,
    monitor: Option<SecurityMonitor>,
    trust_forwarded: bool,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig, monitor: Option<SecurityMonitor>, trust_forwarded: bool) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps: config.requests_per_second as f64,
            burst: config.burst_size.max(1) as f64,
            monitor,
            trust_forwarded,
        }
    }

    /// Take one token for `key`.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");

        if buckets.len() >= PRUNE_AT {
            buckets.retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_BUCKET_TTL);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.try_acquire(self.burst, self.rps, now)
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").len()
    }
}

/// Middleware rejecting clients that exhaust their bucket.
pub async fn rate_limit(State(state): State<Arc<RateLimiterState>>, request: Request<Body>, next: Next) -> Response {
    let ip = client_ip(&request, state.trust_forwarded);
    let key = ip.as_deref().unwrap_or("unknown");

    if state.check(key) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
    metrics::record_guard_rejection("rate_limit");

    if let Some(monitor) = &state.monitor {
        let mut event = NewSecurityEvent::new(EventType::RateLimitExceeded, "Rate limit exceeded")
            .request(request.method().as_str(), request.uri().path())
            .metadata(json!({
                "requestsPerSecond": state.rps,
                "burst": state.burst,
            }));
        if let Some(ip) = ip.clone() {
            event = event.ip(ip);
        }
        if let Some(ua) = user_agent(&request) {
            event = event.user_agent(ua);
        }
        monitor.record(event);
    }

    let mut error = ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
    error.body.limit = Some(state.rps as u64);
    let mut response = error.into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: u32, burst: u32) -> RateLimiterState {
        let config = RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            burst_size: burst,
        };
        RateLimiterState::new(&config, None, false)
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(1, 3);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));

        // Other clients have their own bucket.
        assert!(limiter.check_at("b", now));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_refill() {
        let limiter = limiter(10, 1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("a", now + Duration::from_millis(150)));
    }
}
