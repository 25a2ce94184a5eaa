//! Job-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use stagehand_core::domain::job::JobStatus;
use stagehand_core::dto::job::{JobList, JobLogs, JobSummary, SubmitJob, SubmitJobResponse};

impl OrchestratorClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Submit a playbook run against a target host
    ///
    /// Returns as soon as the orchestrator has recorded the job; the run
    /// itself continues in the background.
    ///
    /// # Example
    /// ```no_run
    /// # use stagehand_client::OrchestratorClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// let accepted = client.submit_job("deploy.yml", "web01").await?;
    /// println!("job {} is {}", accepted.job_id, accepted.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_job(&self, playbook: &str, hostname: &str) -> Result<SubmitJobResponse> {
        let req = SubmitJob {
            playbook: playbook.to_string(),
            hostname: hostname.to_string(),
        };

        tracing::debug!("Submitting {} for {}", playbook, hostname);
        let response = self
            .client
            .post(self.url("/api/execute"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job by ID, without its output
    pub async fn get_job(&self, job_id: i64) -> Result<JobSummary> {
        let response = self
            .client
            .get(self.url(&format!("/api/jobs/{}", job_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List jobs, most recently created first
    ///
    /// # Arguments
    /// * `limit` - Maximum number of jobs; the server default applies when `None`
    /// * `status` - Only return jobs in this status
    pub async fn list_jobs(&self, limit: Option<i64>, status: Option<JobStatus>) -> Result<JobList> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }

        let response = self
            .client
            .get(self.url("/api/jobs"))
            .query(&query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Logs
    // =============================================================================

    /// Get the captured output of a job
    ///
    /// For a running job this is the output produced so far.
    pub async fn get_job_logs(&self, job_id: i64) -> Result<JobLogs> {
        let response = self
            .client
            .get(self.url(&format!("/api/jobs/{}/logs", job_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }
}
