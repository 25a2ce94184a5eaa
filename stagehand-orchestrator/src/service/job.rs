//! Job Service
//!
//! Read access to job records for the API. Jobs are only ever mutated by the
//! execution engine; this layer never writes.

use sqlx::SqlitePool;
use stagehand_core::domain::job::{Job, JobStatus};

use crate::repository::job_repository;

/// Number of jobs listed when the caller gives no limit
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound on a single listing
pub const MAX_LIST_LIMIT: i64 = 500;

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Get a job by ID
pub async fn get_job(pool: &SqlitePool, id: i64) -> Result<Job, JobError> {
    let job = job_repository::find_by_id(pool, id)
        .await?
        .ok_or(JobError::NotFound(id))?;

    Ok(job)
}

/// List jobs, most recently created first
pub async fn list_jobs(
    pool: &SqlitePool,
    limit: Option<i64>,
    status: Option<JobStatus>,
) -> Result<Vec<Job>, JobError> {
    let jobs = job_repository::list(pool, effective_limit(limit), status).await?;
    Ok(jobs)
}

fn effective_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(effective_limit(Some(10)), 10);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(-5)), 1);
        assert_eq!(effective_limit(Some(100_000)), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_get_job_not_found() {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let err = get_job(&pool, 999).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(999)));
    }
}
