//! Stagehand CLI
//!
//! Command-line interface for the Stagehand orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Run playbooks and follow their jobs", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "STAGEHAND_URL", default_value = "http://localhost:8080")]
    orchestrator_url: String,

    /// Print raw JSON responses instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        json: cli.json,
    };

    handle_command(cli.command, &config).await
}
