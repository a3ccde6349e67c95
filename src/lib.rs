//! Security event monitoring, signed webhook dispatch and request-guard
//! middleware for multi-tenant HTTP services.

pub mod admin;
pub mod config;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod webhooks;

pub use config::schema::SentinelConfig;
pub use events::{EventType, NewSecurityEvent, SecurityEvent, Severity};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use monitor::SecurityMonitor;
pub use webhooks::{WebhookDispatcher, WebhookRegistry};
