//! security-sentinel
//!
//! Security event monitor and signed webhook dispatcher built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                  SECURITY SENTINEL                    │
//!                      │                                                       │
//!   Client Request     │  ┌────────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ───────────────────┼─▶│ rate_limit │──▶│   limits   │──▶│   handlers   │  │
//!                      │  └─────┬──────┘   └─────┬──────┘   └──────┬───────┘  │
//!                      │        │ rejections     │                 │ ingest   │
//!                      │        ▼                ▼                 ▼          │
//!                      │  ┌────────────────────────────────────────────────┐  │
//!                      │  │                SecurityMonitor                 │  │
//!                      │  │  store ─ counters ─ reporter ─ anomaly sweep   │  │
//!                      │  └───────────────────────┬────────────────────────┘  │
//!                      │                          ▼                            │
//!                      │                 ┌──────────────────┐                  │
//!                      │                 │ WebhookDispatcher│── signed POST ──┼──▶ Receivers
//!                      │                 └──────────────────┘                  │
//!   Client Response    │  ┌────────────┐   ┌─────────────┐                     │
//!   ◀──────────────────┼──│  headers   │◀──│ compression │◀── handler output   │
//!                      │  └────────────┘   └─────────────┘                     │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use security_sentinel::config::load_with_env;
use security_sentinel::http::HttpServer;
use security_sentinel::lifecycle::{signals, Shutdown};
use security_sentinel::monitor::{SecurityMonitor, TracingReporter};
use security_sentinel::observability::{logging, metrics};
use security_sentinel::webhooks::{WebhookDispatcher, WebhookRegistry};

#[derive(Parser)]
#[command(name = "security-sentinel", version, about = "Security event monitor and webhook dispatcher")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_with_env(args.config.as_deref(), std::env::vars())?;
    logging::init_logging(&config.observability, config.environment);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        webhooks = config.webhooks.len(),
        "security-sentinel starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = WebhookRegistry::from_entries(config.webhooks.clone());
    let dispatcher = WebhookDispatcher::new(registry, config.environment.as_str());
    let monitor = SecurityMonitor::create(config.monitor.clone(), dispatcher, Arc::new(TracingReporter));
    monitor.start();

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone());

    let server = HttpServer::new(config, monitor.clone());
    let served = server.run(listener, shutdown).await;

    monitor.shutdown().await;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
