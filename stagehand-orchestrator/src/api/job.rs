//! Job API Handlers
//!
//! HTTP endpoints for job submission, listing and log retrieval.
//! Reads are snapshots of the job store and never wait for a running job.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use stagehand_core::domain::job::JobStatus;
use stagehand_core::dto::job::{JobList, JobLogs, JobSummary, SubmitJob, SubmitJobResponse};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::job_service;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /api/execute
/// Submit a playbook run; returns as soon as the job record exists
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJob>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(req) = payload?;

    tracing::info!("Submitting {} for host {}", req.playbook, req.hostname);

    let job = state
        .engine
        .submit(&req.playbook, &req.hostname)
        .await
        .inspect_err(|e| tracing::warn!("Submission rejected: {}", e))?;

    let response = SubmitJobResponse {
        job_id: job.id,
        message: "Job started".to_string(),
        status: job.status,
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/jobs/{id}
/// Get job details by ID
pub async fn get_job(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<JobSummary>> {
    let Path(id) = id?;
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(&state.pool, id).await?;

    Ok(Json(job.into()))
}

/// GET /api/jobs
/// List jobs, most recently created first
///
/// Query parameters:
/// - `limit` (optional): maximum number of jobs, default 50
/// - `status` (optional): only jobs in this status
pub async fn list_jobs(
    State(state): State<AppState>,
    params: Result<Query<ListJobsQuery>, QueryRejection>,
) -> ApiResult<Json<JobList>> {
    let Query(params) = params?;
    tracing::debug!("Listing jobs: {:?}", params);

    let jobs = job_service::list_jobs(&state.pool, params.limit, params.status).await?;

    Ok(Json(jobs.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
    pub status: Option<JobStatus>,
}

// =============================================================================
// Log Endpoints
// =============================================================================

/// GET /api/jobs/{id}/logs
/// Get captured output for a job, whether it is still running or finished
pub async fn get_job_logs(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<JobLogs>> {
    let Path(id) = id?;
    tracing::debug!("Getting logs for job: {}", id);

    let job = job_service::get_job(&state.pool, id).await?;

    Ok(Json(job.into()))
}
