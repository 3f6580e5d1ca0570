//! Hostwatch CLI
//!
//! Queries a running agent and works with the local anomaly model.

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{classify, model, status, thresholds};
use hostwatch_lib::MonitorConfig;
use tracing_subscriber::EnvFilter;

/// Hostwatch CLI
#[derive(Parser)]
#[command(name = "hwctl")]
#[command(author, version, about = "CLI for the Hostwatch anomaly monitor", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via HWCTL_API_URL env var)
    #[arg(long, env = "HWCTL_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the agent's host once and show metrics with the anomaly verdict
    Status,

    /// Show component health reported by the agent
    Health,

    /// Train or inspect the local anomaly model
    #[command(subcommand)]
    Model(ModelCommands),

    /// Classify a hand-entered sample against the local model
    Classify {
        /// CPU usage percentage
        #[arg(long)]
        cpu: f64,

        /// Memory usage percentage
        #[arg(long)]
        memory: f64,

        /// 1-minute load average
        #[arg(long)]
        load: f64,

        /// Model artifact path (defaults to MODEL_PATH)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show alert thresholds resolved from the environment
    Thresholds,
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Train on synthetic baseline data and overwrite the artifact
    Train {
        /// Model artifact path (defaults to MODEL_PATH)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show metadata of an existing artifact
    Inspect {
        /// Model artifact path (defaults to MODEL_PATH)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let config = MonitorConfig::from_env();

    match cli.command {
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_status(&client, &config.thresholds, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_health(&client, cli.format).await?;
        }
        Commands::Model(model_cmd) => match model_cmd {
            ModelCommands::Train { path } => {
                model::train(model::model_config(&config, path), cli.format)?;
            }
            ModelCommands::Inspect { path } => {
                model::inspect(&model::model_config(&config, path).path, cli.format)?;
            }
        },
        Commands::Classify {
            cpu,
            memory,
            load,
            path,
        } => {
            classify::classify(
                model::model_config(&config, path),
                cpu,
                memory,
                load,
                cli.format,
            )?;
        }
        Commands::Thresholds => {
            thresholds::show_thresholds(&config, cli.format)?;
        }
    }

    Ok(())
}
