//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services sit between the HTTP handlers and the repository / catalog.

pub mod job;
pub mod playbook;

// Re-export for convenience
pub use job as job_service;
pub use playbook as playbook_service;
