//! Per-job process supervision
//!
//! One supervisor task owns one child process: it marks the job running,
//! pumps both output pipes into the job store while waiting for the process,
//! and records the exit code once the process has exited and its pipes are
//! drained (or the drain grace period has run out).

use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::repository::job_repository::{self, JobUpdate};

/// Exit code recorded when waiting on the child fails or no code is available
const UNKNOWN_EXIT_CODE: i32 = -1;

/// How long output may stay silent once the runner process has exited
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Largest chunk of output held back waiting for a line break
const MAX_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn name(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }

    fn append(self, chunk: String) -> JobUpdate {
        match self {
            OutputStream::Stdout => JobUpdate::AppendStdout(chunk),
            OutputStream::Stderr => JobUpdate::AppendStderr(chunk),
        }
    }
}

/// Arguments passed to the runner program:
/// `<playbook> [-i <inventory>] --limit <host> [extra args...]`
pub(crate) fn build_args(runner: &RunnerConfig, playbook: &Path, target_host: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![playbook.as_os_str().to_owned()];

    if let Some(inventory) = &runner.inventory_path {
        args.push("-i".into());
        args.push(inventory.as_os_str().to_owned());
    }

    args.push("--limit".into());
    args.push(target_host.into());
    args.extend(runner.extra_args.iter().map(OsString::from));
    args
}

/// Build the child process for one job
///
/// The environment is reduced to `PATH`, `HOME` and, when configured,
/// `ANSIBLE_CONFIG`.
pub(crate) fn build_command(runner: &RunnerConfig, playbook: &Path, target_host: &str) -> Command {
    let mut command = Command::new(&runner.program);
    command.args(build_args(runner, playbook, target_host));

    command.env_clear();
    command.env(
        "PATH",
        std::env::var_os("PATH").unwrap_or_else(|| "/usr/bin:/bin".into()),
    );
    if let Some(home) = std::env::var_os("HOME") {
        command.env("HOME", home);
    }
    if let Some(config) = &runner.ansible_config {
        command.env("ANSIBLE_CONFIG", config);
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    command
}

/// Run one job's process to completion
pub(crate) async fn supervise(pool: SqlitePool, job_id: i64, mut command: Command) {
    debug!("Launching job {}: {:?}", job_id, command.as_std());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let exit_code = launch_failure_exit_code(&e);
            error!("Job {} failed to launch: {}", job_id, e);

            let update = JobUpdate::LaunchFailed {
                exit_code,
                error: format!("Failed to launch runner process: {}\n", e),
                at: Utc::now(),
            };
            if let Err(e) = job_repository::update(&pool, job_id, update).await {
                error!("Job {}: could not record launch failure: {}", job_id, e);
            }
            return;
        }
    };

    let started = JobUpdate::Start {
        started_at: Utc::now(),
    };
    if let Err(e) = job_repository::update(&pool, job_id, started).await {
        error!("Job {}: could not mark as running, killing process: {}", job_id, e);
        if let Err(e) = child.kill().await {
            warn!("Job {}: failed to kill process: {}", job_id, e);
        }
        return;
    }

    info!("Job {} running (pid {:?})", job_id, child.id());

    let progress = Arc::new(AtomicU64::new(0));
    let mut stdout_pump = child.stdout.take().map(|out| {
        tokio::spawn(pump(pool.clone(), job_id, out, OutputStream::Stdout, progress.clone()))
    });
    let mut stderr_pump = child.stderr.take().map(|err| {
        tokio::spawn(pump(pool.clone(), job_id, err, OutputStream::Stderr, progress.clone()))
    });

    let exit_code = match child.wait().await {
        Ok(status) => exit_code_of(status),
        Err(e) => {
            error!("Job {}: failed to wait for process: {}", job_id, e);
            let note = format!("Failed to wait for runner process: {}\n", e);
            if let Err(e) = job_repository::update(&pool, job_id, JobUpdate::AppendStderr(note)).await
            {
                warn!("Job {}: could not record wait failure: {}", job_id, e);
            }
            UNKNOWN_EXIT_CODE
        }
    };

    // Pipes inherited by background children can outlive the runner: keep
    // draining while output still arrives, stop after OUTPUT_DRAIN_GRACE idle.
    let drained = {
        let drain = async {
            if let Some(pump) = stdout_pump.as_mut() {
                let _ = pump.await;
            }
            if let Some(pump) = stderr_pump.as_mut() {
                let _ = pump.await;
            }
        };
        tokio::pin!(drain);

        let mut seen = progress.load(Ordering::Relaxed);
        loop {
            if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut drain).await.is_ok() {
                break true;
            }
            let now = progress.load(Ordering::Relaxed);
            if now == seen {
                break false;
            }
            seen = now;
        }
    };

    if !drained {
        warn!(
            "Job {}: output still open {:?} after exit with nothing new, no longer reading it",
            job_id, OUTPUT_DRAIN_GRACE
        );
        for pump in stdout_pump.iter().chain(stderr_pump.iter()) {
            pump.abort();
        }
        let note = format!(
            "Output capture stopped {}s after the runner exited: a background process kept its output open\n",
            OUTPUT_DRAIN_GRACE.as_secs()
        );
        if let Err(e) = job_repository::update(&pool, job_id, JobUpdate::AppendStderr(note)).await {
            warn!("Job {}: could not record truncated output: {}", job_id, e);
        }
    }

    let finished = JobUpdate::Finish {
        exit_code,
        completed_at: Utc::now(),
    };
    match job_repository::update(&pool, job_id, finished).await {
        Ok(()) => info!("Job {} completed with exit code {}", job_id, exit_code),
        Err(e) => error!("Job {}: could not record completion: {}", job_id, e),
    }
}

/// Copy one pipe into the job record as it arrives
///
/// A chunk is appended at every `\n` or `\r`, and whenever
/// [`MAX_CHUNK_BYTES`] accumulate without one, so progress output shows up
/// in live reads. Chunks never split a UTF-8 sequence and invalid bytes are
/// replaced, so concatenating the appends reproduces the stream. Every byte
/// read is counted in `progress`.
async fn pump<R>(
    pool: SqlitePool,
    job_id: i64,
    reader: R,
    stream: OutputStream,
    progress: Arc<AtomicU64>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let available = match reader.fill_buf().await {
            Ok(buf) => buf,
            Err(e) => {
                warn!("Job {}: error reading {}: {}", job_id, stream.name(), e);
                break;
            }
        };

        if available.is_empty() {
            break;
        }

        let (taken, boundary) = match available.iter().position(|b| matches!(b, b'\n' | b'\r')) {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        pending.extend_from_slice(&available[..taken]);
        reader.consume(taken);
        progress.fetch_add(taken as u64, Ordering::Relaxed);

        let flush_len = if boundary {
            pending.len()
        } else if pending.len() >= MAX_CHUNK_BYTES {
            utf8_flush_len(&pending)
        } else {
            0
        };

        if flush_len > 0 {
            let rest = pending.split_off(flush_len);
            let chunk = std::mem::replace(&mut pending, rest);
            append(&pool, job_id, stream, &chunk).await;
        }
    }

    if !pending.is_empty() {
        append(&pool, job_id, stream, &pending).await;
    }
}

async fn append(pool: &SqlitePool, job_id: i64, stream: OutputStream, bytes: &[u8]) {
    let chunk = String::from_utf8_lossy(bytes).into_owned();
    if let Err(e) = job_repository::update(pool, job_id, stream.append(chunk)).await {
        warn!(
            "Job {}: dropping {} output: {}",
            job_id,
            stream.name(),
            e
        );
    }
}

/// Length of the prefix of `buf` that ends on a UTF-8 boundary
///
/// Only an incomplete sequence at the very end is held back; invalid bytes
/// elsewhere are flushed and replaced on decode.
fn utf8_flush_len(buf: &[u8]) -> usize {
    match std::str::from_utf8(buf) {
        Ok(_) => buf.len(),
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => e.valid_up_to(),
        Err(_) => buf.len(),
    }
}

/// Shell conventions: 127 for a missing program, 126 for one that cannot run
fn launch_failure_exit_code(err: &std::io::Error) -> i32 {
    match err.kind() {
        std::io::ErrorKind::NotFound => 127,
        std::io::ErrorKind::PermissionDenied => 126,
        _ => 1,
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    UNKNOWN_EXIT_CODE
}
