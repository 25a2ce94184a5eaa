//! Playbook domain types

use serde::{Deserialize, Serialize};

/// A runnable playbook file in the catalog directory
///
/// A snapshot of filesystem state at the time the catalog was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
    pub name: String,
    /// Size in bytes
    pub size: u64,
    pub modified: chrono::DateTime<chrono::Utc>,
}
