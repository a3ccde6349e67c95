//! Security response headers.
//!
//! # Responsibilities
//! - Add the fixed browser-hardening header set to every response
//! - Pick a Cache-Control policy from the request path
//! - Emit HSTS only for secure requests in production
//! - Strip `X-Powered-By`
//!
//! # Design Decisions
//! - Headers are written after the inner service runs, so they override
//!   anything set upstream
//! - Forwarded protocol is only trusted behind a configured proxy

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{Environment, HeadersConfig};
use crate::security::client::is_secure;

pub const API_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";
pub const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(), payment=()";

static X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");
static X_PERMITTED_CROSS_DOMAIN_POLICIES: HeaderName = HeaderName::from_static("x-permitted-cross-domain-policies");
static X_DNS_PREFETCH_CONTROL: HeaderName = HeaderName::from_static("x-dns-prefetch-control");
static PERMISSIONS_POLICY_HEADER: HeaderName = HeaderName::from_static("permissions-policy");

const STATIC_EXTENSIONS: &[&str] = &[
    "js", "mjs", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif", "woff", "woff2", "ttf",
    "eot", "otf", "map",
];

/// Cache class of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Api,
    StaticAsset,
    Other,
}

pub fn classify_path(path: &str) -> PathClass {
    if path == "/api" || path.starts_with("/api/") {
        return PathClass::Api;
    }
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && STATIC_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) => {
            PathClass::StaticAsset
        }
        _ => PathClass::Other,
    }
}

pub struct HeaderPolicy {
    pub config: HeadersConfig,
    pub environment: Environment,
    pub trust_forwarded: bool,
}

impl HeaderPolicy {
    pub fn new(config: HeadersConfig, environment: Environment, trust_forwarded: bool) -> Self {
        Self {
            config,
            environment,
            trust_forwarded,
        }
    }

    /// The headers this policy writes for a response to `path`.
    pub fn headers_for(&self, path: &str, secure: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers.insert(PERMISSIONS_POLICY_HEADER.clone(), HeaderValue::from_static(PERMISSIONS_POLICY));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(X_PERMITTED_CROSS_DOMAIN_POLICIES.clone(), HeaderValue::from_static("none"));
        headers.insert(X_DNS_PREFETCH_CONTROL.clone(), HeaderValue::from_static("off"));

        match classify_path(path) {
            PathClass::Api => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(API_CACHE_CONTROL));
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
            }
            PathClass::StaticAsset => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(STATIC_CACHE_CONTROL));
            }
            PathClass::Other => {
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(DEFAULT_CACHE_CONTROL));
            }
        }

        if self.environment.is_production() && secure {
            let hsts = format!("max-age={}; includeSubDomains; preload", self.config.hsts_max_age_secs);
            if let Ok(value) = HeaderValue::from_str(&hsts) {
                headers.insert(header::STRICT_TRANSPORT_SECURITY, value);
            }
        }

        headers
    }
}

/// Middleware applying `HeaderPolicy` to every response.
pub async fn security_headers(State(policy): State<Arc<HeaderPolicy>>, request: Request<Body>, next: Next) -> Response {
    if !policy.config.enabled {
        return next.run(request).await;
    }

    let secure = is_secure(&request, policy.trust_forwarded);
    let headers = policy.headers_for(request.uri().path(), secure);

    let mut response = next.run(request).await;
    let target = response.headers_mut();
    target.remove(&X_POWERED_BY);
    for (name, value) in headers.iter() {
        target.insert(name.clone(), value.clone());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(environment: Environment) -> HeaderPolicy {
        HeaderPolicy::new(HeadersConfig::default(), environment, true)
    }

    #[test]
    fn test_classify_path() {
        assert_eq!(classify_path("/api/security/events"), PathClass::Api);
        assert_eq!(classify_path("/api"), PathClass::Api);
        assert_eq!(classify_path("/apiary"), PathClass::Other);
        assert_eq!(classify_path("/assets/app.3f2a.js"), PathClass::StaticAsset);
        assert_eq!(classify_path("/fonts/Inter.WOFF2"), PathClass::StaticAsset);
        assert_eq!(classify_path("/.css"), PathClass::Other);
        assert_eq!(classify_path("/dashboard"), PathClass::Other);
    }

    #[test]
    fn test_cache_control_by_class() {
        let p = policy(Environment::Development);
        let api = p.headers_for("/api/x", false);
        assert_eq!(api[header::CACHE_CONTROL], API_CACHE_CONTROL);
        assert_eq!(api[header::PRAGMA], "no-cache");
        assert_eq!(api[header::EXPIRES], "0");

        assert_eq!(p.headers_for("/logo.png", false)[header::CACHE_CONTROL], STATIC_CACHE_CONTROL);
        assert_eq!(p.headers_for("/", false)[header::CACHE_CONTROL], DEFAULT_CACHE_CONTROL);
        assert!(p.headers_for("/", false).get(header::PRAGMA).is_none());
    }

    #[test]
    fn test_hsts_requires_production_and_tls() {
        assert!(policy(Environment::Development)
            .headers_for("/", true)
            .get(header::STRICT_TRANSPORT_SECURITY)
            .is_none());
        assert!(policy(Environment::Production)
            .headers_for("/", false)
            .get(header::STRICT_TRANSPORT_SECURITY)
            .is_none());
        assert_eq!(
            policy(Environment::Production).headers_for("/", true)[header::STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains; preload"
        );
    }

    #[test]
    fn test_fixed_header_set() {
        let h = policy(Environment::Test).headers_for("/", false);
        assert_eq!(h[header::REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert_eq!(h["permissions-policy"], PERMISSIONS_POLICY);
        assert_eq!(h[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(h["x-permitted-cross-domain-policies"], "none");
        assert_eq!(h["x-dns-prefetch-control"], "off");
    }
}
