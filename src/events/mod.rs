//! Security event model.
//!
//! # Data Flow
//! ```text
//! Caller (middleware, handler, anomaly sweep)
//!     → NewSecurityEvent (type + request context)
//!     → classifier.rs (type → severity, static table)
//!     → SecurityEvent (id, timestamp, severity stamped)
//!     → monitor store / webhook dispatcher
//! ```
//!
//! # Design Decisions
//! - Severity is never supplied by callers; it is always derived from the type
//! - Events are immutable once stamped

pub mod classifier;
pub mod types;

pub use classifier::classify;
pub use types::{EventType, NewSecurityEvent, SecurityEvent, Severity};
