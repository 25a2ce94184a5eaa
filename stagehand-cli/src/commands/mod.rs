//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod playbook;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use stagehand_core::domain::job::JobStatus;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the orchestrator is reachable
    Health,
    /// List available playbooks
    Playbooks,
    /// List jobs, newest first
    Jobs {
        /// Maximum number of jobs to show
        #[arg(short, long)]
        limit: Option<i64>,

        /// Only show jobs in this status (pending, running, success, failed)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },
    /// Show job details
    Job {
        /// Job ID
        id: i64,
    },
    /// Run a playbook against a host
    Run {
        /// Playbook file name, as listed by `stagehand playbooks`
        playbook: String,

        /// Target host or inventory pattern
        host: String,

        /// Stream the job's output until it finishes
        #[arg(short, long)]
        follow: bool,
    },
    /// Show a job's captured output
    Logs {
        /// Job ID
        id: i64,

        /// Keep printing new output until the job finishes
        #[arg(short, long)]
        follow: bool,

        /// Seconds between polls while following
        #[arg(long, default_value = "1.0")]
        interval: f64,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Health => playbook::health(config).await,
        Commands::Playbooks => playbook::list_playbooks(config).await,
        Commands::Jobs { limit, status } => job::list_jobs(config, limit, status).await,
        Commands::Job { id } => job::get_job(config, id).await,
        Commands::Run {
            playbook,
            host,
            follow,
        } => job::run(config, &playbook, &host, follow).await,
        Commands::Logs {
            id,
            follow,
            interval,
        } => job::logs(config, id, follow, interval).await,
    }
}

/// Pretty-print any response as JSON
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
