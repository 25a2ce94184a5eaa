//! Health Check and Index Handlers
//!
//! Endpoints for monitoring and API discovery.

use axum::Json;
use stagehand_core::dto::service::{Health, ServiceInfo};
use std::collections::BTreeMap;

const SERVICE_NAME: &str = "stagehand-orchestrator";

/// GET /api/health
/// Health check endpoint
pub async fn health_check() -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

/// GET /api
/// Describe the available endpoints
pub async fn api_index() -> Json<ServiceInfo> {
    let endpoints = [
        ("health", "/api/health"),
        ("playbooks", "/api/playbooks"),
        ("execute", "/api/execute (POST)"),
        ("jobs", "/api/jobs"),
        ("job_status", "/api/jobs/{id}"),
        ("job_logs", "/api/jobs/{id}/logs"),
    ]
    .into_iter()
    .map(|(name, path)| (name.to_string(), path.to_string()))
    .collect::<BTreeMap<_, _>>();

    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}
