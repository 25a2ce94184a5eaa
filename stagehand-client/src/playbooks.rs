//! Catalog and service endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use stagehand_core::dto::playbook::PlaybookList;
use stagehand_core::dto::service::Health;

impl OrchestratorClient {
    /// List the playbooks available to run
    pub async fn list_playbooks(&self) -> Result<PlaybookList> {
        let response = self.client.get(self.url("/api/playbooks")).send().await?;

        self.handle_response(response).await
    }

    /// Check that the orchestrator is up
    pub async fn health(&self) -> Result<Health> {
        let response = self.client.get(self.url("/api/health")).send().await?;

        self.handle_response(response).await
    }
}
