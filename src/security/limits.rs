//! Request size and shape limits.
//!
//! # Responsibilities
//! - Enforce maximum URI length and query parameter count
//! - Enforce maximum header count and per-header size
//! - Enforce maximum request body size
//! - Enforce maximum JSON nesting depth and array length on JSON bodies
//!
//! # Design Decisions
//! - Cheap checks (URI, headers, Content-Length) run before the body is read
//! - Every body is read through a size cap, so chunked or unlabelled bodies
//!   are held to the same limit as those with Content-Length
//! - JSON bodies are walked in full, then handed on unchanged
//! - Violations short-circuit with the JSON error envelope and are recorded
//!   as `REQUEST_LIMIT_EXCEEDED` when a monitor is attached

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::events::{EventType, NewSecurityEvent};
use crate::http::error::ApiError;
use crate::monitor::SecurityMonitor;
use crate::observability::metrics;
use crate::security::client::{client_ip, user_agent};

pub struct LimitsState {
    pub limits: LimitsConfig,
    pub monitor: Option<SecurityMonitor>,
    pub trust_forwarded: bool,
}

/// A single limit violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub reason: &'static str,
    pub status: StatusCode,
    pub error: &'static str,
    pub limit: usize,
    pub received: usize,
}

impl Violation {
    fn new(reason: &'static str, status: StatusCode, error: &'static str, limit: usize, received: usize) -> Self {
        Self {
            reason,
            status,
            error,
            limit,
            received,
        }
    }

    fn into_api_error(&self) -> ApiError {
        ApiError::limit(self.status, self.error, self.limit as u64, self.received as u64)
    }
}

/// Maximum container nesting and the longest array found in a JSON value.
///
/// Scalars have depth 0; every object or array adds one level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonShape {
    pub depth: usize,
    pub max_array_length: usize,
}

pub fn json_shape(value: &Value) -> JsonShape {
    let mut shape = JsonShape::default();
    let mut stack: Vec<(&Value, usize)> = vec![(value, 0)];

    while let Some((node, level)) = stack.pop() {
        match node {
            Value::Array(items) => {
                shape.depth = shape.depth.max(level + 1);
                shape.max_array_length = shape.max_array_length.max(items.len());
                stack.extend(items.iter().map(|v| (v, level + 1)));
            }
            Value::Object(map) => {
                shape.depth = shape.depth.max(level + 1);
                stack.extend(map.values().map(|v| (v, level + 1)));
            }
            _ => {}
        }
    }

    shape
}

/// Checks that need only the request head.
pub fn check_head<B>(request: &Request<B>, limits: &LimitsConfig) -> Option<Violation> {
    let uri = request.uri();
    let url_length = uri.path_and_query().map(|pq| pq.as_str().len()).unwrap_or(0);
    if url_length > limits.max_url_length {
        return Some(Violation::new(
            "url_length",
            StatusCode::URI_TOO_LONG,
            "URL too long",
            limits.max_url_length,
            url_length,
        ));
    }

    let query_params = uri
        .query()
        .map(|q| q.split('&').filter(|pair| !pair.is_empty()).count())
        .unwrap_or(0);
    if query_params > limits.max_query_params {
        return Some(Violation::new(
            "query_params",
            StatusCode::BAD_REQUEST,
            "Too many query parameters",
            limits.max_query_params,
            query_params,
        ));
    }

    let headers = request.headers();
    if headers.len() > limits.max_headers {
        return Some(Violation::new(
            "header_count",
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            "Too many headers",
            limits.max_headers,
            headers.len(),
        ));
    }

    let largest_header = headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len())
        .max()
        .unwrap_or(0);
    if largest_header > limits.max_header_size {
        return Some(Violation::new(
            "header_size",
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            "Header too large",
            limits.max_header_size,
            largest_header,
        ));
    }

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(length) = content_length {
        if length > limits.max_body_size {
            return Some(body_too_large(limits, length));
        }
    }

    None
}

/// Checks on a parsed JSON body.
pub fn check_json(value: &Value, limits: &LimitsConfig) -> Option<Violation> {
    let shape = json_shape(value);
    if shape.depth > limits.max_json_depth {
        return Some(Violation::new(
            "json_depth",
            StatusCode::BAD_REQUEST,
            "JSON nesting too deep",
            limits.max_json_depth,
            shape.depth,
        ));
    }
    if shape.max_array_length > limits.max_array_length {
        return Some(Violation::new(
            "array_length",
            StatusCode::BAD_REQUEST,
            "Array too large",
            limits.max_array_length,
            shape.max_array_length,
        ));
    }
    None
}

fn body_too_large(limits: &LimitsConfig, received: usize) -> Violation {
    Violation::new(
        "body_size",
        StatusCode::PAYLOAD_TOO_LARGE,
        "Request body too large",
        limits.max_body_size,
        received,
    )
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

enum BodyError {
    TooLarge(usize),
    Unreadable(axum::Error),
}

async fn read_body(body: Body, max: usize) -> Result<Vec<u8>, BodyError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Unreadable)?;
        if buf.len() + chunk.len() > max {
            return Err(BodyError::TooLarge(buf.len() + chunk.len()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Middleware enforcing `LimitsConfig`.
pub async fn request_limits(State(state): State<Arc<LimitsState>>, request: Request<Body>, next: Next) -> Response {
    if !state.limits.enabled {
        return next.run(request).await;
    }

    if let Some(violation) = check_head(&request, &state.limits) {
        return reject(&state, &request, violation);
    }

    let (parts, body) = request.into_parts();
    let bytes = match read_body(body, state.limits.max_body_size).await {
        Ok(bytes) => bytes,
        Err(BodyError::TooLarge(received)) => {
            let request = Request::from_parts(parts, ());
            return reject(&state, &request, body_too_large(&state.limits, received));
        }
        Err(BodyError::Unreadable(e)) => {
            tracing::debug!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return ApiError::invalid_request().into_response();
        }
    };

    if is_json(&parts.headers) && !bytes.is_empty() {
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(path = %parts.uri.path(), error = %e, "Malformed JSON body");
                metrics::record_guard_rejection("malformed_json");
                return ApiError::invalid_request().into_response();
            }
        };

        if let Some(violation) = check_json(&value, &state.limits) {
            let request = Request::from_parts(parts, ());
            return reject(&state, &request, violation);
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn reject<B>(state: &LimitsState, request: &Request<B>, violation: Violation) -> Response {
    let ip = client_ip(request, state.trust_forwarded);
    tracing::warn!(
        reason = violation.reason,
        limit = violation.limit,
        received = violation.received,
        path = %request.uri().path(),
        client = ip.as_deref().unwrap_or("-"),
        "Request rejected by limits"
    );
    metrics::record_guard_rejection(violation.reason);

    if let Some(monitor) = &state.monitor {
        let mut event = NewSecurityEvent::new(EventType::RequestLimitExceeded, violation.error)
            .request(request.method().as_str(), request.uri().path())
            .metadata(json!({
                "reason": violation.reason,
                "limit": violation.limit,
                "received": violation.received,
            }));
        if let Some(ip) = ip {
            event = event.ip(ip);
        }
        if let Some(ua) = user_agent(request) {
            event = event.user_agent(ua);
        }
        monitor.record(event);
    }

    violation.into_api_error().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitsConfig {
        LimitsConfig {
            max_url_length: 32,
            max_query_params: 2,
            max_headers: 3,
            max_header_size: 64,
            max_body_size: 100,
            max_json_depth: 3,
            max_array_length: 10,
            ..Default::default()
        }
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    #[test]
    fn test_json_shape() {
        assert_eq!(json_shape(&json!(1)).depth, 0);
        assert_eq!(json_shape(&json!({})).depth, 1);
        assert_eq!(json_shape(&json!({"a": {"b": [1, 2, 3]}})), JsonShape { depth: 3, max_array_length: 3 });
        assert_eq!(json_shape(&json!([[1], [1, 2, 3, 4]])).max_array_length, 4);
    }

    #[test]
    fn test_depth_and_array_violations() {
        let deep = json!({"a": {"a": {"a": {"a": {"a": 1}}}}});
        let v = check_json(&deep, &limits()).unwrap();
        assert_eq!((v.error, v.limit, v.received), ("JSON nesting too deep", 3, 5));

        let wide = json!({ "items": (0..20).collect::<Vec<_>>() });
        let v = check_json(&wide, &limits()).unwrap();
        assert_eq!(v.status, StatusCode::BAD_REQUEST);
        assert_eq!((v.error, v.limit, v.received), ("Array too large", 10, 20));

        assert!(check_json(&json!({"a": [1, 2]}), &limits()).is_none());
    }

    #[test]
    fn test_head_violations() {
        let v = check_head(&get("/api/aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"), &limits()).unwrap();
        assert_eq!(v.status, StatusCode::URI_TOO_LONG);

        let v = check_head(&get("/api?a=1&b=2&c=3"), &limits()).unwrap();
        assert_eq!((v.status, v.received), (StatusCode::BAD_REQUEST, 3));

        let req = Request::builder()
            .uri("/")
            .header("a", "1")
            .header("b", "1")
            .header("c", "1")
            .header("d", "1")
            .body(())
            .unwrap();
        let v = check_head(&req, &limits()).unwrap();
        assert_eq!(v.error, "Too many headers");

        let req = Request::builder().uri("/").header("x-big", "v".repeat(100)).body(()).unwrap();
        let v = check_head(&req, &limits()).unwrap();
        assert_eq!((v.status, v.error), (StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE, "Header too large"));

        let req = Request::builder().uri("/").header("content-length", "1000").body(()).unwrap();
        let v = check_head(&req, &limits()).unwrap();
        assert_eq!(v.status, StatusCode::PAYLOAD_TOO_LARGE);

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/problem+json".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json(&headers));

        assert!(check_head(&get("/api?a=1"), &limits()).is_none());
    }
}
