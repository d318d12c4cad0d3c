use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::pipeline::PublishPipeline;
use crate::config::DeployerConfig;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the publisher server on `bind` and serve until Ctrl+C.
pub async fn start_server(config: &DeployerConfig, bind: SocketAddr) -> Result<()> {
    let pipeline =
        PublishPipeline::from_config(config).context("Failed to build HTTP clients")?;
    let app = build_router(Arc::new(AppState { pipeline }));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "Publisher listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
