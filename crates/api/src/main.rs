//! Wish Tree - Main Entry Point

use anyhow::{anyhow, Context};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use wishtree_api::{init_logging, run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    init_logging(&config.log_level, config.log_format).map_err(|e| anyhow!(e))?;

    info!("=== Wish Tree v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    run_server(config, Some(metrics)).await
}
