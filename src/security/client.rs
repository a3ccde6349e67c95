//! Client identity helpers shared by the guard middleware.
//!
//! Forwarded headers are only honoured when the listener is configured to sit
//! behind a trusted proxy; otherwise the socket address is authoritative.

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Request},
};
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Best-effort client IP for a request.
pub fn client_ip<B>(request: &Request<B>, trust_forwarded: bool) -> Option<String> {
    resolve_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0),
        trust_forwarded,
    )
}

fn resolve_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> Option<String> {
    if trust_forwarded {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

/// Whether the request arrived over TLS, directly or via a trusted proxy.
pub fn is_secure<B>(request: &Request<B>, trust_forwarded: bool) -> bool {
    if request.uri().scheme_str() == Some("https") {
        return true;
    }
    trust_forwarded
        && request
            .headers()
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

pub fn user_agent<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/x");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.7:5555".parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_forwarded_for_only_when_trusted() {
        let req = request(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(client_ip(&req, true).as_deref(), Some("203.0.113.9"));
        assert_eq!(client_ip(&req, false).as_deref(), Some("192.0.2.7"));
    }

    #[test]
    fn test_secure_detection() {
        let req = request(&[("x-forwarded-proto", "https")]);
        assert!(is_secure(&req, true));
        assert!(!is_secure(&req, false));

        let tls = Request::builder()
            .uri("https://example.com/")
            .body(Body::empty())
            .unwrap();
        assert!(is_secure(&tls, false));
    }
}
