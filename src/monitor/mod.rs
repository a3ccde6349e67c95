//! Security event monitor.
//!
//! # Data Flow
//! ```text
//! NewSecurityEvent (middleware, API ingest, anomaly sweep)
//!     → service.rs (stamp id/timestamp/severity)
//!     → store.rs (bounded FIFO + per-type and hourly counters)
//!     → reporter.rs (high and critical only)
//!     → webhooks dispatcher (spawned, never awaited by the caller)
//!
//! Background (owned by the handle between start() and shutdown()):
//!     cleanup tick → store.purge_before(now - retention)
//!     anomaly tick → anomaly.rs → SUSPICIOUS_ACTIVITY via record()
//!
//! Reads:
//!     query.rs (search, recent, metrics, dashboard), newest first
//! ```
//!
//! # Design Decisions
//! - The monitor is an explicitly constructed handle, never a global
//! - Severity always comes from the classifier
//! - Telemetry goes through an injected `Reporter`

pub mod anomaly;
pub mod query;
pub mod reporter;
pub mod service;
pub mod store;

pub use query::{IpCount, SecurityDashboard, SecurityEventQuery, SecurityMetrics, TimelineBucket, TypeCount};
pub use reporter::{NoopReporter, Reporter, ReporterError, TracingReporter};
pub use service::SecurityMonitor;
pub use store::EventStore;
