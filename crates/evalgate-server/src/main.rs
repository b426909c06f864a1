//! Evalgate server — entry point.
//!
//! Loads configuration, runs startup provider validation, and serves the
//! HTTP API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use evalgate_core::load_config;
use evalgate_server::{create_app, monitor, AppState};

/// Evalgate — resilient AI evaluation gateway for student submissions
#[derive(Parser)]
#[command(name = "evalgate", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file (default: $EVALGATE_CONFIG or ./evalgate.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let config = load_config(cli.config.as_deref());
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config);

    // Startup validation installs the provider client when the ping
    // succeeds; otherwise evaluations route to manual review until an
    // admin revalidation fixes the situation.
    monitor::run_validation(&state).await;

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "evalgate listening");
    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("evalgate=debug,info")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
