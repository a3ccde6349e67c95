//! Security API and admin routes through the full router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use security_sentinel::config::SentinelConfig;
use security_sentinel::http::build_router;
use security_sentinel::monitor::{NoopReporter, SecurityMonitor};
use security_sentinel::webhooks::{WebhookDispatcher, WebhookRegistry};

mod common;

const ADMIN_KEY: &str = "test-admin-key";

fn setup() -> (SecurityMonitor, Router) {
    let mut config: SentinelConfig = common::test_config();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();

    let dispatcher = WebhookDispatcher::new(WebhookRegistry::new(), "test");
    let monitor = SecurityMonitor::create(config.monitor.clone(), dispatcher, Arc::new(NoopReporter));
    let router = build_router(Arc::new(config), monitor.clone());
    (monitor, router)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", common::API_KEY))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn api_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", common::API_KEY))
        .body(Body::empty())
        .unwrap()
}

fn admin(method: &str, uri: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_ingest_assigns_severity() {
    let (monitor, app) = setup();

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/api/security/events",
            &json!({
                "type": "TENANT_ISOLATION_VIOLATION",
                "message": "cross-tenant read",
                "tenantId": "t-1",
                "userId": "u-9",
                "severity": "low"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["severity"], "critical");
    assert_eq!(body["tenantId"], "t-1");
    assert!(body["id"].as_str().is_some());
    assert_eq!(monitor.len(), 1);
}

#[tokio::test]
async fn test_unknown_event_type_is_rejected() {
    let (monitor, app) = setup();
    let (status, body) = call(
        &app,
        json_request("POST", "/api/security/events", &json!({"type": "NOT_A_TYPE", "message": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    assert!(monitor.is_empty());
}

#[tokio::test]
async fn test_search_and_recent() {
    let (_monitor, app) = setup();
    for (t, ip) in [
        ("LOGIN_FAILED", "10.0.0.1"),
        ("LOGIN_FAILED", "10.0.0.2"),
        ("XSS_ATTEMPT", "10.0.0.1"),
        ("LOGIN_SUCCESS", "10.0.0.1"),
    ] {
        let (status, _) = call(
            &app,
            json_request("POST", "/api/security/events", &json!({"type": t, "message": "m", "ip": ip})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(
        &app,
        api_get("/api/security/events?type=LOGIN_FAILED&ip=10.0.0.1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = call(
        &app,
        api_get("/api/security/events?severity=medium"),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = call(
        &app,
        api_get("/api/security/events/recent?limit=2"),
    )
    .await;
    let recent = body.as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["type"], "LOGIN_SUCCESS");

    let (status, body) = call(
        &app,
        api_get("/api/security/events?severity=extreme"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
}

#[tokio::test]
async fn test_metrics_and_dashboard() {
    let (monitor, app) = setup();
    for _ in 0..3 {
        monitor.record(
            security_sentinel::NewSecurityEvent::new(security_sentinel::EventType::BruteForceDetected, "burst")
                .ip("203.0.113.5"),
        );
    }

    let (status, metrics) = call(&app, api_get("/api/security/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["totalEvents"], 3);
    assert_eq!(metrics["bySeverity"]["critical"], 3);
    assert_eq!(metrics["topIps"][0], json!({"ip": "203.0.113.5", "count": 3}));

    let (status, dashboard) =
        call(&app, api_get("/api/security/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["timeline"].as_array().unwrap().len(), 24);
    assert_eq!(dashboard["criticalEvents"].as_array().unwrap().len(), 3);
    assert_eq!(dashboard["topEventTypes"][0]["type"], "BRUTE_FORCE_DETECTED");
}

#[tokio::test]
async fn test_security_api_requires_api_key() {
    let (monitor, app) = setup();

    let forged = json!({"type": "SQL_INJECTION_ATTEMPT", "message": "forged", "userId": "victim"});
    let request = Request::builder()
        .method("POST")
        .uri("/api/security/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&forged).unwrap()))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(monitor.is_empty());

    monitor.record(
        security_sentinel::NewSecurityEvent::new(security_sentinel::EventType::LoginFailed, "x").user("victim"),
    );
    for uri in [
        "/api/security/events?userId=victim",
        "/api/security/events/recent",
        "/api/security/metrics",
        "/api/security/dashboard",
    ] {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, request).await.0, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, body) = call(&app, api_get("/api/security/events?userId=victim")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Liveness stays open.
    let (status, _) = call(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_requires_bearer_key() {
    let (_monitor, app) = setup();

    let (status, body) = call(&app, Request::builder().uri("/admin/webhooks").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let request = Request::builder()
        .uri("/admin/webhooks")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(call(&app, request).await.0, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, admin("GET", "/admin/webhooks", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_admin_webhook_lifecycle() {
    let (monitor, app) = setup();
    let receiver = common::start_receiver(200).await;

    let config = json!({
        "url": receiver.url(),
        "secret": "never-shown",
        "minSeverity": "high",
        "retry": {"maxAttempts": 1, "backoffMs": 10}
    });
    let (status, body) = call(&app, admin("PUT", "/admin/webhooks/siem", Some(&config))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "siem");
    assert_eq!(monitor.registry().len(), 1);

    let (status, _) = call(&app, admin("PUT", "/admin/webhooks/siem", Some(&config))).await;
    assert_eq!(status, StatusCode::OK, "duplicate id replaces");
    assert_eq!(monitor.registry().len(), 1);

    let (_, list) = call(&app, admin("GET", "/admin/webhooks", None)).await;
    assert_eq!(list[0]["minSeverity"], "high");
    assert!(list[0].get("secret").is_none());
    assert!(!list.to_string().contains("never-shown"));

    let (status, report) = call(&app, admin("POST", "/admin/webhooks/siem/test", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["delivered"], true);
    assert_eq!(receiver.calls(), 1);
    assert!(monitor.is_empty(), "test events are not recorded");

    let (status, _) = call(&app, admin("DELETE", "/admin/webhooks/siem", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, admin("DELETE", "/admin/webhooks/siem", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, _) = call(&app, admin("POST", "/admin/webhooks/siem/test", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_rejects_invalid_webhook() {
    let (monitor, app) = setup();

    let config = json!({
        "url": "https://hooks.example.com/a",
        "secret": "s",
        "timeoutMs": 0,
        "retry": {"maxAttempts": 0, "backoffMs": 10}
    });
    let (status, body) = call(&app, admin("PUT", "/admin/webhooks/broken", Some(&config))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("webhooks.broken.timeoutMs"), "{message}");
    assert!(message.contains("webhooks.broken.retry.maxAttempts"), "{message}");
    assert!(monitor.registry().is_empty());
}

#[tokio::test]
async fn test_health() {
    let (_monitor, app) = setup();
    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
}
