//! Webhook subsystem.
//!
//! # Data Flow
//! ```text
//! SecurityEvent
//!     → registry.rs (snapshot of registrations whose filter matches)
//!     → dispatcher.rs (concurrent delivery, all-settled join)
//!         → payload.rs (fresh payload per attempt)
//!         → signature.rs (HMAC-SHA256 over the exact body bytes)
//!         → POST with X-Webhook-Signature / -ID / -Attempt
//! ```

pub mod dispatcher;
pub mod payload;
pub mod registry;
pub mod signature;

pub use dispatcher::{DeliveryError, DeliveryReport, WebhookDispatcher};
pub use payload::WebhookPayload;
pub use registry::{should_send, WebhookRegistry};
pub use signature::{sign, verify, SignatureError};
