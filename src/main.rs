//! EventLens - Kubernetes failure-event watcher
//!
#![doc = "EventLens - Kubernetes failure-event watcher"]
#![doc = "Main entry point for the EventLens service."]

use anyhow::Result;
use clap::Parser;

use eventlens::cli::{Cli, Commands};
use eventlens::commands;
use eventlens::commands::fetch_logs::FetchLogsArgs;
use eventlens::config::Config;
use eventlens::metrics::init_metrics_exporter;
use eventlens::watcher::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/eventlens.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Initialize logging and metrics
    init_logging(&config.logging)?;
    init_metrics_exporter();

    // Execute command
    match cli.command {
        Commands::Watch { .. } => {
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting EventLens watcher"
            );
            commands::watch::run_watch(config).await?;
            Ok(())
        }
        Commands::FetchLogs {
            namespace,
            pod,
            reason,
            message,
            tail,
        } => {
            tracing::debug!(namespace = %namespace, pod = %pod, "Fetching pod logs");
            let args = FetchLogsArgs {
                namespace,
                pod,
                reason,
                message,
                tail,
            };
            commands::fetch_logs::run_fetch_logs(config, args).await?;
            Ok(())
        }
    }
}
