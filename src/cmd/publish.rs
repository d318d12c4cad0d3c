//! One-shot publish command: `pagesmith publish --request <file>`.

use std::path::Path;

use anyhow::{Context, Result};
use pagesmith::config::DeployerConfig;
use pagesmith::deploy::models::TaskRequest;
use pagesmith::deploy::pipeline::PublishPipeline;

fn read_request(path: &Path) -> Result<TaskRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task request {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse task request {}", path.display()))
}

pub async fn cmd_publish(config: &DeployerConfig, request_path: &Path) -> Result<()> {
    let request = read_request(request_path)?;

    pagesmith::logging::init_tracing(&config.log).context("Failed to initialize logging")?;
    config.trace_loaded();

    let pipeline = PublishPipeline::from_config(config).context("Failed to build HTTP clients")?;
    let response = pipeline
        .run(&request)
        .await
        .with_context(|| format!("Publishing task '{}' failed", request.task))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
