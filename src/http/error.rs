//! JSON error envelope shared by handlers and guard middleware.
//!
//! Every client-visible failure renders as
//! `{"error": ..., "limit"?: n, "received"?: n, "message"?: ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                limit: None,
                received: None,
                message: None,
            },
        }
    }

    /// A limit violation carrying the configured threshold and the observed value.
    pub fn limit(status: StatusCode, error: impl Into<String>, limit: u64, received: u64) -> Self {
        let mut err = Self::new(status, error);
        err.body.limit = Some(limit);
        err.body.received = Some(received);
        err
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }

    pub fn invalid_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::invalid_request().with_message(message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_absent_fields() {
        let err = ApiError::invalid_request();
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid request" }));
    }

    #[test]
    fn test_limit_envelope() {
        let err = ApiError::limit(StatusCode::BAD_REQUEST, "JSON nesting too deep", 3, 5);
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "JSON nesting too deep", "limit": 3, "received": 5 })
        );
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
