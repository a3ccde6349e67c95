//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound webhook delivery:
//!     → timeout per attempt (tokio::time::timeout, drops the request future)
//!     → On failure: retries.rs (bounded attempts)
//!     → backoff.rs (linear delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries are bounded; exhausted deliveries are dropped, never propagated

pub mod backoff;
pub mod retries;

pub use backoff::linear_backoff;
pub use retries::{retry_with_backoff, RetryOutcome};
