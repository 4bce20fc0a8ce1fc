//! Intake proxy.
//!
//! Main entry point for the intake server. Loads configuration, sets up
//! structured logging and serves the intake endpoints until shutdown.

use anyhow::{Context, Result};
use intake_api::{start_server, AppState, Config};
use tracing::info;

const DEFAULT_LOG_FILTER: &str = "info,intake=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log)?;

    info!("Starting intake proxy");

    let addr = config.parse_server_addr()?;
    info!(
        server_addr = %addr,
        tenant_source = ?config.tenant_source,
        tenant_dir = %config.tenant_dir.display(),
        upstream_timeout_seconds = config.upstream_timeout_seconds,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    start_server(state, addr).await.context("HTTP server failed")?;

    info!("Intake proxy shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` wins over the configured level; the
/// built-in filter is used when neither parses.
fn init_tracing(configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}
