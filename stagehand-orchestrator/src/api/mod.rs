//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod playbook;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::catalog::Catalog;
use crate::engine::ExecutionEngine;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub catalog: Catalog,
    pub engine: ExecutionEngine,
}

impl AppState {
    pub fn new(pool: SqlitePool, catalog: Catalog, engine: ExecutionEngine) -> Self {
        Self {
            pool,
            catalog,
            engine,
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState, max_request_bytes: usize) -> Router {
    Router::new()
        // Health check and discovery
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/api", get(health::api_index))
        .route("/api/", get(health::api_index))
        // Catalog
        .route("/api/playbooks", get(playbook::list_playbooks))
        // Jobs
        .route("/api/execute", post(job::submit_job))
        .route("/api/jobs", get(job::list_jobs))
        .route("/api/jobs/{id}", get(job::get_job))
        .route("/api/jobs/{id}/logs", get(job::get_job_logs))
        .fallback(not_found)
        // Add state and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}
