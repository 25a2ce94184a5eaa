//! Job Repository
//!
//! Handles all database operations related to jobs. This is the only place
//! that reads or writes the `jobs` table.
//!
//! Every mutation is a single `UPDATE` whose `WHERE` clause also checks the
//! expected source status. SQLite serializes writers, so two updates to the
//! same row can never interleave, and output appends (`stdout = stdout || ?`)
//! are never lost or torn.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use stagehand_core::domain::job::{Job, JobStatus};

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(i64),

    #[error("job {id} is {status}, mutation not applicable")]
    InvalidTransition { id: i64, status: JobStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A single mutation applied by the execution engine
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// `pending -> running`
    Start { started_at: DateTime<Utc> },
    /// Append to stdout while running
    AppendStdout(String),
    /// Append to stderr while running
    AppendStderr(String),
    /// `running -> success | failed`, derived from the exit code
    Finish {
        exit_code: i32,
        completed_at: DateTime<Utc>,
    },
    /// `pending -> failed` when the process could not be spawned
    LaunchFailed {
        exit_code: i32,
        error: String,
        at: DateTime<Utc>,
    },
}

/// Create a new pending job in the database
pub async fn create(
    pool: &SqlitePool,
    playbook_name: &str,
    target_host: &str,
) -> Result<Job, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO jobs (playbook_name, target_host, status, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(playbook_name)
    .bind(target_host)
    .bind(JobStatus::Pending.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Job {
        id: result.last_insert_rowid(),
        playbook_name: playbook_name.to_string(),
        target_host: target_host.to_string(),
        status: JobStatus::Pending,
        created_at: now,
        started_at: None,
        completed_at: None,
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
    })
}

/// Find a job by ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, playbook_name, target_host, status, created_at, started_at,
               completed_at, exit_code, stdout, stderr
        FROM jobs
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List jobs, most recently created first, optionally filtered by status
pub async fn list(
    pool: &SqlitePool,
    limit: i64,
    status: Option<JobStatus>,
) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, playbook_name, target_host, status, created_at, started_at,
               completed_at, exit_code, stdout, stderr
        FROM jobs
        WHERE ?1 IS NULL OR status = ?1
        ORDER BY id DESC
        LIMIT ?2
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Apply a mutation to an existing job
///
/// Fails with [`StoreError::NotFound`] for unknown ids and
/// [`StoreError::InvalidTransition`] when the job is not in the state the
/// mutation requires (e.g. appending output to a finished job).
pub async fn update(pool: &SqlitePool, id: i64, update: JobUpdate) -> Result<(), StoreError> {
    let result = match update {
        JobUpdate::Start { started_at } => {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = ?1, started_at = ?2
                WHERE id = ?3 AND status = ?4
                "#,
            )
            .bind(JobStatus::Running.as_str())
            .bind(started_at)
            .bind(id)
            .bind(JobStatus::Pending.as_str())
            .execute(pool)
            .await?
        }
        JobUpdate::AppendStdout(chunk) => {
            sqlx::query("UPDATE jobs SET stdout = stdout || ?1 WHERE id = ?2 AND status = ?3")
                .bind(chunk)
                .bind(id)
                .bind(JobStatus::Running.as_str())
                .execute(pool)
                .await?
        }
        JobUpdate::AppendStderr(chunk) => {
            sqlx::query("UPDATE jobs SET stderr = stderr || ?1 WHERE id = ?2 AND status = ?3")
                .bind(chunk)
                .bind(id)
                .bind(JobStatus::Running.as_str())
                .execute(pool)
                .await?
        }
        JobUpdate::Finish {
            exit_code,
            completed_at,
        } => {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = ?1, exit_code = ?2, completed_at = ?3
                WHERE id = ?4 AND status = ?5
                "#,
            )
            .bind(JobStatus::from_exit_code(exit_code).as_str())
            .bind(exit_code)
            .bind(completed_at)
            .bind(id)
            .bind(JobStatus::Running.as_str())
            .execute(pool)
            .await?
        }
        JobUpdate::LaunchFailed {
            exit_code,
            error,
            at,
        } => {
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = ?1, exit_code = ?2, started_at = ?3, completed_at = ?3,
                    stderr = stderr || ?4
                WHERE id = ?5 AND status = ?6
                "#,
            )
            .bind(JobStatus::Failed.as_str())
            .bind(exit_code)
            .bind(at)
            .bind(error)
            .bind(id)
            .bind(JobStatus::Pending.as_str())
            .execute(pool)
            .await?
        }
    };

    if result.rows_affected() > 0 {
        return Ok(());
    }

    match find_by_id(pool, id).await? {
        Some(job) => Err(StoreError::InvalidTransition {
            id,
            status: job.status,
        }),
        None => Err(StoreError::NotFound(id)),
    }
}

/// Fail every job left `pending` or `running` by a previous orchestrator run
///
/// Their supervisors died with the old process, so nothing else would ever
/// move them to a terminal state. Returns the number of jobs failed.
pub async fn fail_unfinished(
    pool: &SqlitePool,
    exit_code: i32,
    note: &str,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = ?1, exit_code = ?2, started_at = COALESCE(started_at, ?3),
            completed_at = ?3, stderr = stderr || ?4
        WHERE status IN (?5, ?6)
        "#,
    )
    .bind(JobStatus::Failed.as_str())
    .bind(exit_code)
    .bind(at)
    .bind(note)
    .bind(JobStatus::Pending.as_str())
    .bind(JobStatus::Running.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn string_to_status(s: &str) -> JobStatus {
    s.parse().unwrap_or_else(|err| {
        tracing::warn!("{}; treating row as failed", err);
        JobStatus::Failed
    })
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    playbook_name: String,
    target_host: String,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            playbook_name: row.playbook_name,
            target_host: row.target_host,
            status: string_to_status(&row.status),
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            exit_code: row.exit_code,
            stdout: row.stdout,
            stderr: row.stderr,
        }
    }
}
