use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use pagesmith::config::DeployerConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(version, about = "Generate static apps, publish them to GitHub Pages and report back")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the task endpoint
    Serve {
        /// Listen address (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run a single publish for a task request stored on disk
    Publish {
        /// Path to the task request JSON document
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Validate configuration and print a redacted summary
    CheckConfig,
}

fn load_config() -> Result<DeployerConfig> {
    DeployerConfig::from_env().context("Invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match &cli.command {
        Commands::Serve { bind } => {
            let config = load_config()?;
            cmd::cmd_serve(&config, *bind).await?;
        }
        Commands::Publish { request } => {
            let config = load_config()?;
            cmd::cmd_publish(&config, request).await?;
        }
        Commands::CheckConfig => {
            let config = load_config()?;
            cmd::cmd_check_config(&config);
        }
    }

    Ok(())
}
