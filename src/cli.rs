//! Command-line interface definition for EventLens
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the long-running watch service and a one-shot log fetch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EventLens - Kubernetes failure-event watcher
///
/// Watches cluster events and attaches the logs of the affected
/// containers to every actionable notification.
#[derive(Parser, Debug, Clone)]
#[command(name = "eventlens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/eventlens.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for EventLens
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the watcher service until interrupted
    Watch {
        /// Log incidents instead of sending them to the configured sink
        #[arg(long)]
        dry_run: bool,

        /// Comma-separated event types to act on (overrides config)
        #[arg(long)]
        actionable_types: Option<String>,

        /// Emit logs as JSON
        #[arg(long)]
        json_logs: bool,

        /// Also append logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Fetch container logs for one pod as the processor would
    FetchLogs {
        /// Pod namespace
        #[arg(short, long)]
        namespace: String,

        /// Pod name
        #[arg(short, long)]
        pod: String,

        /// Event reason used to pick previous or current logs
        #[arg(short, long, default_value = "")]
        reason: String,

        /// Event message (the liveness-failure marker is looked up here)
        #[arg(short, long, default_value = "")]
        message: String,

        /// Number of trailing lines per container (overrides config)
        #[arg(short, long)]
        tail: Option<u32>,
    },
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/eventlens.yaml".to_string()),
            verbose: false,
            command: Commands::Watch {
                dry_run: false,
                actionable_types: None,
                json_logs: false,
                log_file: None,
            },
        }
    }
}
