//! Admin API for runtime webhook management.
//!
//! All routes require `Authorization: Bearer <admin.api_key>` and are only
//! mounted when `admin.enabled` is set.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/webhooks", get(list_webhooks))
        .route("/admin/webhooks/{id}", put(put_webhook).delete(delete_webhook))
        .route("/admin/webhooks/{id}/test", post(test_webhook))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
