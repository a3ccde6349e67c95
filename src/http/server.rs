//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the security API and admin routes
//! - Wire up middleware (request id, tracing, timeout, guards)
//! - Bind the server to a listener and stop on shutdown

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{auth::api_auth_middleware, setup_admin_router};
use crate::config::SentinelConfig;
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::monitor::SecurityMonitor;
use crate::observability::metrics;
use crate::security::{
    compress_response, rate_limit, request_limits, security_headers, HeaderPolicy, LimitsState, RateLimiterState,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: SecurityMonitor,
    pub config: Arc<SentinelConfig>,
    pub header_policy: Arc<HeaderPolicy>,
}

/// HTTP server for the security API.
pub struct HttpServer {
    router: Router,
    config: Arc<SentinelConfig>,
}

impl HttpServer {
    pub fn new(config: SentinelConfig, monitor: SecurityMonitor) -> Self {
        let config = Arc::new(config);
        let router = build_router(config.clone(), monitor);
        Self { router, config }
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.environment,
            "HTTP server starting"
        );

        let mut shutdown_rx = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: Arc<SentinelConfig>, monitor: SecurityMonitor) -> Router {
    let trust_forwarded = config.listener.trust_forwarded_headers;
    let header_policy = Arc::new(HeaderPolicy::new(
        config.headers.clone(),
        config.environment,
        trust_forwarded,
    ));

    let state = AppState {
        monitor: monitor.clone(),
        config: config.clone(),
        header_policy: header_policy.clone(),
    };

    let mut api = Router::new()
        .route(
            "/api/security/events",
            get(handlers::search_events).post(handlers::ingest_event),
        )
        .route("/api/security/events/recent", get(handlers::recent_events))
        .route("/api/security/metrics", get(handlers::security_metrics))
        .route("/api/security/dashboard", get(handlers::security_dashboard));
    if config.api.auth_required {
        api = api.route_layer(middleware::from_fn_with_state(state.clone(), api_auth_middleware));
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/security/headers-debug", get(handlers::headers_debug))
        .merge(api)
        .with_state(state.clone());

    if config.admin.enabled {
        router = router.merge(setup_admin_router(state));
    }

    if config.compression.enabled {
        router = router.layer(middleware::from_fn(compress_response));
    }

    let limits_state = Arc::new(LimitsState {
        limits: config.limits.clone(),
        monitor: Some(monitor.clone()),
        trust_forwarded,
    });
    router = router.layer(middleware::from_fn_with_state(limits_state, request_limits));

    if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiterState::new(&config.rate_limit, Some(monitor), trust_forwarded));
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    // Headers sit outside the timeout so 408 responses are hardened too.
    router
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(header_policy, security_headers))
        .layer(middleware::from_fn(track_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
