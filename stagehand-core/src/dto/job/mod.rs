//! Job DTOs

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobStatus};

/// Request to run a playbook against a target host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    /// Playbook file name as listed by the catalog
    pub playbook: String,
    /// Target host or inventory pattern, passed to the runner as-is
    pub hostname: String,
}

/// Response to an accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: i64,
    pub message: String,
    pub status: JobStatus,
}

/// Job metadata without captured output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: i64,
    pub playbook_name: String,
    pub target_host: String,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub exit_code: Option<i32>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            playbook_name: job.playbook_name,
            target_host: job.target_host,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            exit_code: job.exit_code,
        }
    }
}

/// Job listing, most recently created first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobList {
    pub count: usize,
    pub jobs: Vec<JobSummary>,
}

impl From<Vec<Job>> for JobList {
    fn from(jobs: Vec<Job>) -> Self {
        let jobs: Vec<JobSummary> = jobs.into_iter().map(JobSummary::from).collect();
        Self {
            count: jobs.len(),
            jobs,
        }
    }
}

/// Captured output of a job, live or final
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogs {
    #[serde(flatten)]
    pub job: JobSummary,
    pub stdout: String,
    pub stderr: String,
}

impl From<Job> for JobLogs {
    fn from(mut job: Job) -> Self {
        let stdout = std::mem::take(&mut job.stdout);
        let stderr = std::mem::take(&mut job.stderr);
        Self {
            job: job.into(),
            stdout,
            stderr,
        }
    }
}
