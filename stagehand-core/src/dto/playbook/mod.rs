//! Playbook DTOs

use serde::{Deserialize, Serialize};

use crate::domain::playbook::Playbook;

/// Catalog listing, sorted by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookList {
    pub count: usize,
    pub playbooks: Vec<Playbook>,
}

impl From<Vec<Playbook>> for PlaybookList {
    fn from(playbooks: Vec<Playbook>) -> Self {
        Self {
            count: playbooks.len(),
            playbooks,
        }
    }
}
