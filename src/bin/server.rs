//! Agentrade server binary.
//!
//! Runs the decision-cycle engine headlessly: no HTTP surface, no incoming connections. The
//! scheduler polls for due system tasks in the background; metrics are pushed as structured
//! JSON log lines to stdout.
//!
//! # Environment variables
//! - `OBSERVABILITY_ENABLED` - enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - seconds between metric snapshots (default: 60)

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

use agentrade::application::Application;
use agentrade::config::Config;
use agentrade::infrastructure::observability::{Metrics, MetricsReporter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("agentrade server {} starting...", env!("CARGO_PKG_VERSION"));
    info!("mode: headless (no UI, no HTTP server)");

    let config = Config::from_env()?;
    info!(database_url = %config.database.url, "configuration loaded");

    info!("building application...");
    let observability_enabled = config.observability_enabled;
    let app = Application::build(config).await?;

    info!("starting scheduler...");
    let handle = app.start().await?;
    info!("scheduler running.");

    if observability_enabled {
        let metrics = Metrics::new()?;
        let interval = std::env::var("OBSERVABILITY_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let reporter = MetricsReporter::new(handle.agents.clone(), metrics, interval);
        tokio::spawn(async move { reporter.run().await });
        info!(interval, "metrics reporter started");
    } else {
        info!("metrics reporting disabled.");
    }

    info!("server running. press ctrl+c to shut down.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received. exiting...");

    Ok(())
}
