//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Monitor → start() → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Server stops accepting → Drain → monitor.shutdown() → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - One broadcast coordinator shared by every long-running task

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
