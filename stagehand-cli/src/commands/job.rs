//! Job command handlers
//!
//! Submitting runs, listing and inspecting jobs, and printing or following
//! their captured output.

use std::io::Write;
use std::time::Duration;

use anyhow::{Result, bail};
use colored::*;
use stagehand_client::OrchestratorClient;
use stagehand_core::domain::job::JobStatus;
use stagehand_core::dto::job::{JobLogs, JobSummary};

use super::print_json;
use crate::config::Config;

/// Poll interval used by `run --follow`
const RUN_FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

/// List jobs, newest first
pub async fn list_jobs(config: &Config, limit: Option<i64>, status: Option<JobStatus>) -> Result<()> {
    let list = config.client().list_jobs(limit, status).await?;

    if config.json {
        return print_json(&list);
    }

    if list.jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} job(s):", list.count).bold());
    println!();
    for job in &list.jobs {
        print_job_summary(job);
    }

    Ok(())
}

/// Get and display a single job
pub async fn get_job(config: &Config, id: i64) -> Result<()> {
    let job = config.client().get_job(id).await?;

    if config.json {
        return print_json(&job);
    }

    print_job_details(&job);
    Ok(())
}

/// Submit a playbook run, optionally following it to completion
pub async fn run(config: &Config, playbook: &str, host: &str, follow: bool) -> Result<()> {
    check_output_mode(config.json, follow)?;

    let client = config.client();
    let accepted = client.submit_job(playbook, host).await?;

    if config.json {
        return print_json(&accepted);
    }

    println!(
        "{} {} (job {}, {})",
        "✓".green(),
        accepted.message,
        accepted.job_id.to_string().cyan(),
        colorize_status(accepted.status)
    );

    if !follow {
        println!(
            "{}",
            format!("  Follow with: stagehand logs {} --follow", accepted.job_id).dimmed()
        );
        return Ok(());
    }

    println!("{}", "─".repeat(80).dimmed());
    let job = follow_logs(&client, accepted.job_id, RUN_FOLLOW_INTERVAL).await?;
    println!("{}", "─".repeat(80).dimmed());

    finish(&job)
}

/// Print a job's output, optionally following it until the job finishes
pub async fn logs(config: &Config, id: i64, follow: bool, interval: f64) -> Result<()> {
    check_output_mode(config.json, follow)?;

    let client = config.client();

    if !follow {
        let logs = client.get_job_logs(id).await?;

        if config.json {
            return print_json(&logs);
        }

        print_logs(&logs);
        return Ok(());
    }

    let interval = parse_interval(interval)?;
    let job = follow_logs(&client, id, interval).await?;
    finish(&job)
}

// =============================================================================
// Following
// =============================================================================

/// `--json` output is only available for one-shot commands
fn check_output_mode(json: bool, follow: bool) -> Result<()> {
    if json && follow {
        bail!("--json cannot be combined with --follow");
    }
    Ok(())
}

/// Poll interval from `--interval` seconds
fn parse_interval(seconds: f64) -> Result<Duration> {
    if seconds <= 0.0 {
        bail!("--interval must be a positive number of seconds");
    }

    Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow::anyhow!("--interval {} is not a usable number of seconds", seconds))
}

/// Byte offsets of what has already been printed from each stream
#[derive(Debug, Default)]
struct Printed {
    stdout: usize,
    stderr: usize,
}

/// Poll a job's logs, printing only new output, until the job is terminal
///
/// Live output only ever grows, so each poll's text starts with everything
/// printed so far.
async fn follow_logs(client: &OrchestratorClient, id: i64, interval: Duration) -> Result<JobSummary> {
    let mut printed = Printed::default();

    loop {
        let logs = client.get_job_logs(id).await?;

        let out = new_suffix(&logs.stdout, printed.stdout);
        let err = new_suffix(&logs.stderr, printed.stderr);

        if !out.is_empty() {
            print!("{}", out);
            std::io::stdout().flush()?;
        }
        if !err.is_empty() {
            eprint!("{}", err.yellow());
        }

        printed.stdout += out.len();
        printed.stderr += err.len();

        if logs.job.status.is_terminal() {
            return Ok(logs.job);
        }

        tokio::time::sleep(interval).await;
    }
}

/// The part of `text` past the first `printed` bytes
fn new_suffix(text: &str, printed: usize) -> &str {
    text.get(printed..).unwrap_or("")
}

/// Report the final status; a failed job fails the command
fn finish(job: &JobSummary) -> Result<()> {
    let exit_code = job
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "Job {} finished: {} (exit code {})",
        job.id,
        colorize_status(job.status),
        exit_code
    );

    if job.status == JobStatus::Failed {
        bail!("job {} failed with exit code {}", job.id, exit_code);
    }

    Ok(())
}

// =============================================================================
// Output
// =============================================================================

/// Print a one-entry job summary
fn print_job_summary(job: &JobSummary) {
    println!(
        "  {} Job {}  {}",
        "▸".cyan(),
        job.id.to_string().bold(),
        colorize_status(job.status)
    );
    println!("    Playbook: {}", job.playbook_name);
    println!("    Host:     {}", job.target_host);
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(code) = job.exit_code {
        println!("    Exit:     {}", code);
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &JobSummary) {
    println!("{}", "Job Details:".bold());
    println!("  ID:         {}", job.id.to_string().cyan());
    println!("  Playbook:   {}", job.playbook_name);
    println!("  Host:       {}", job.target_host);
    println!("  Status:     {}", colorize_status(job.status));
    println!("  Created:    {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = job.started_at {
        println!("  Started:    {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:  {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = job.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:   {}s", duration.num_seconds());
        }
    }

    if let Some(code) = job.exit_code {
        let code = code.to_string();
        let code = if job.status == JobStatus::Success {
            code.green()
        } else {
            code.red()
        };
        println!("  Exit Code:  {}", code);
    }
}

/// Print both captured streams of a job
fn print_logs(logs: &JobLogs) {
    println!(
        "{}",
        format!("Logs for job {} ({}):", logs.job.id, logs.job.status).bold()
    );

    println!("{}", "── stdout".dimmed());
    if logs.stdout.is_empty() {
        println!("{}", "(no output)".dimmed());
    } else {
        print!("{}", logs.stdout);
    }

    println!("{}", "── stderr".dimmed());
    if logs.stderr.is_empty() {
        println!("{}", "(no output)".dimmed());
    } else {
        print!("{}", logs.stderr.yellow());
    }

    if !logs.job.status.is_terminal() {
        println!(
            "{}",
            format!("Job is still {}; output so far.", logs.job.status).dimmed()
        );
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
