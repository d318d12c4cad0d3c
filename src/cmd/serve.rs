//! HTTP server command: `pagesmith serve`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use pagesmith::config::DeployerConfig;

pub async fn cmd_serve(config: &DeployerConfig, bind: Option<SocketAddr>) -> Result<()> {
    pagesmith::logging::init_tracing(&config.log).context("Failed to initialize logging")?;
    config.trace_loaded();

    let addr = bind.unwrap_or(config.bind_addr);
    pagesmith::deploy::server::start_server(config, addr).await
}
