//! Playbook Service
//!
//! Catalog access for the API. A missing or unreadable playbook directory
//! degrades to an empty listing instead of failing the request.

use stagehand_core::domain::playbook::Playbook;

use crate::catalog::Catalog;

/// List available playbooks, or none if the catalog cannot be read
pub async fn list_playbooks(catalog: &Catalog) -> Vec<Playbook> {
    match catalog.list().await {
        Ok(playbooks) => playbooks,
        Err(e) => {
            tracing::warn!("Serving empty playbook list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_catalog_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path().join("absent"), vec![".yml".to_string()]);

        assert!(list_playbooks(&catalog).await.is_empty());
    }
}
