//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (APP_ENV, WEBHOOK_<NAME>_* overlay)
//!     → validation.rs (semantic checks)
//!     → SentinelConfig (validated, immutable)
//!     → handed to the monitor and HTTP server at startup
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Environment scanning happens here, never inside the webhook registry
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_with_env, ConfigError};
pub use schema::{
    AdminConfig, ApiConfig, CompressionConfig, Environment, HeadersConfig, LimitsConfig, ListenerConfig,
    MonitorConfig, ObservabilityConfig, RateLimitConfig, RetryPolicy, SentinelConfig,
    TimeoutConfig, WebhookConfig, WebhookEntry,
};
