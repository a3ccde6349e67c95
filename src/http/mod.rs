//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace, headers, timeout, guard layers)
//!     → api key check on /api/security/* (except headers-debug)
//!     → handlers.rs (ingest, search, metrics, dashboard, headers-debug)
//!     → admin routes (webhook management, bearer key)
//!     → error.rs (JSON envelope for every failure)
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use server::{build_router, AppState, HttpServer};
