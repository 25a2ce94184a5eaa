//! Playbook API Handlers
//!
//! HTTP endpoints for the playbook catalog.

use axum::{Json, extract::State};
use stagehand_core::dto::playbook::PlaybookList;

use crate::api::AppState;
use crate::service::playbook_service;

/// GET /api/playbooks
/// List runnable playbooks; empty if the catalog cannot be read
pub async fn list_playbooks(State(state): State<AppState>) -> Json<PlaybookList> {
    tracing::debug!("Listing playbooks in {}", state.catalog.dir().display());

    let playbooks = playbook_service::list_playbooks(&state.catalog).await;

    Json(playbooks.into())
}
