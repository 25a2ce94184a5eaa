//! Execution Engine
//!
//! Accepts run requests, creates job records and launches one external
//! process per accepted job. Submission returns as soon as the record exists;
//! the process is owned by a background supervisor task (see [`supervisor`])
//! that streams its output into the job store and records the outcome.
//!
//! There is no admission control, queue or timeout: every accepted job runs
//! immediately and until its process exits.

mod supervisor;

use std::sync::Arc;

use sqlx::SqlitePool;
use stagehand_core::domain::job::Job;
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::config::RunnerConfig;
use crate::repository::job_repository;

/// Longest accepted target host, as for a fully qualified domain name
const MAX_TARGET_LEN: usize = 253;

/// Exit code recorded for jobs whose supervisor did not survive a restart
const INTERRUPTED_EXIT_CODE: i32 = -1;

/// Submission error type
///
/// All variants are raised before a job record exists.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Playbook '{0}' not found")]
    UnknownPlaybook(String),

    #[error("Invalid target host: {0}")]
    InvalidTarget(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Launches playbook runs and supervises their processes
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    pool: SqlitePool,
    catalog: Catalog,
    runner: Arc<RunnerConfig>,
}

impl ExecutionEngine {
    pub fn new(pool: SqlitePool, catalog: Catalog, runner: RunnerConfig) -> Self {
        Self {
            pool,
            catalog,
            runner: Arc::new(runner),
        }
    }

    /// Fail jobs that a previous run of the orchestrator left unfinished
    ///
    /// Must run before the API starts accepting submissions.
    pub async fn recover_interrupted(&self) -> Result<u64, sqlx::Error> {
        let failed = job_repository::fail_unfinished(
            &self.pool,
            INTERRUPTED_EXIT_CODE,
            "Job interrupted: orchestrator restarted before the run finished\n",
            chrono::Utc::now(),
        )
        .await?;

        if failed > 0 {
            tracing::warn!("Marked {} interrupted job(s) as failed", failed);
        }

        Ok(failed)
    }

    /// Validate a run request, create its job record and start the process
    ///
    /// Returns the job as created (status `pending`). The caller observes
    /// progress by reading the job store.
    pub async fn submit(&self, playbook_name: &str, target_host: &str) -> Result<Job, SubmitError> {
        self.submit_inner(playbook_name, target_host)
            .await
            .map(|(job, _)| job)
    }

    /// Like [`submit`](Self::submit), also returning the supervisor handle
    pub async fn submit_tracked(
        &self,
        playbook_name: &str,
        target_host: &str,
    ) -> Result<(Job, JoinHandle<()>), SubmitError> {
        self.submit_inner(playbook_name, target_host).await
    }

    async fn submit_inner(
        &self,
        playbook_name: &str,
        target_host: &str,
    ) -> Result<(Job, JoinHandle<()>), SubmitError> {
        let playbook = match self.catalog.find(playbook_name).await {
            Ok(Some(playbook)) => playbook,
            Ok(None) => return Err(SubmitError::UnknownPlaybook(playbook_name.to_string())),
            Err(e) => {
                tracing::warn!("Rejecting submission for '{}': {}", playbook_name, e);
                return Err(SubmitError::UnknownPlaybook(playbook_name.to_string()));
            }
        };

        let target_host = validate_target(target_host)?;

        let job = job_repository::create(&self.pool, &playbook.name, target_host).await?;

        tracing::info!(
            "Job {} created: {} -> {}",
            job.id,
            job.playbook_name,
            job.target_host
        );

        let command =
            supervisor::build_command(&self.runner, &self.catalog.path_of(&playbook), target_host);
        let handle = tokio::spawn(supervisor::supervise(self.pool.clone(), job.id, command));

        Ok((job, handle))
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check a caller-supplied target host and return it trimmed
///
/// The host is otherwise opaque (it may be an inventory pattern), but it must
/// not be empty, must not contain control characters and must not start with
/// `-`, so it can never be read as a runner option.
pub fn validate_target(target_host: &str) -> Result<&str, SubmitError> {
    let target = target_host.trim();

    if target.is_empty() {
        return Err(SubmitError::InvalidTarget(
            "hostname cannot be empty".to_string(),
        ));
    }

    if target.len() > MAX_TARGET_LEN {
        return Err(SubmitError::InvalidTarget(format!(
            "hostname too long (max: {} chars)",
            MAX_TARGET_LEN
        )));
    }

    if target.chars().any(char::is_control) {
        return Err(SubmitError::InvalidTarget(
            "hostname contains control characters".to_string(),
        ));
    }

    if target.starts_with('-') {
        return Err(SubmitError::InvalidTarget(
            "hostname cannot start with '-'".to_string(),
        ));
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target_valid() {
        assert_eq!(validate_target("10.0.0.5").unwrap(), "10.0.0.5");
        assert_eq!(validate_target("  web-01.example.com ").unwrap(), "web-01.example.com");
        assert_eq!(validate_target("webservers:&prod").unwrap(), "webservers:&prod");
    }

    #[test]
    fn test_validate_target_empty() {
        assert!(matches!(
            validate_target(""),
            Err(SubmitError::InvalidTarget(_))
        ));
        assert!(matches!(
            validate_target("   "),
            Err(SubmitError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_validate_target_malformed() {
        assert!(validate_target("--become").is_err());
        assert!(validate_target("host\nother").is_err());
        assert!(validate_target(&"a".repeat(254)).is_err());
        assert!(validate_target(&"a".repeat(253)).is_ok());
    }
}
