//! Repository Module
//!
//! Data access layer for the orchestrator. The job repository is the only
//! component that holds authoritative job state; everything else reads and
//! writes through it.

pub mod job;

// Re-export for convenience
pub use job as job_repository;
