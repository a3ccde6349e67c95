//! Request guard middleware.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP token bucket)
//!     → limits.rs (URI, headers, body size, JSON shape)
//!     → handler
//! Outgoing response:
//!     → compression.rs (preset by path, gzip/deflate)
//!     → headers.rs (hardening headers, Cache-Control, HSTS)
//! ```
//!
//! # Design Decisions
//! - Each stage is an independent `axum::middleware::from_fn` layer
//! - Rejections short-circuit with the JSON error envelope
//! - Guard rejections are recorded as security events when a monitor is attached
//! - No trust in forwarded headers unless the listener says so

pub mod client;
pub mod compression;
pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use compression::compress_response;
pub use headers::{security_headers, HeaderPolicy};
pub use limits::{request_limits, LimitsState};
pub use rate_limit::{rate_limit, RateLimiterState};
