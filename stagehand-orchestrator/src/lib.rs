//! Stagehand Orchestrator
//!
//! Runs automation playbooks as asynchronous jobs on a single node.
//!
//! Architecture:
//! - Catalog: enumerates playbook files in the configured directory
//! - Repository: the job store (SQLite), sole owner of job state
//! - Engine: validates submissions and supervises one process per job
//! - Services / API: read-side logic and the HTTP surface

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod repository;
pub mod service;
