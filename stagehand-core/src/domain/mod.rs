//! Core domain types
//!
//! These types represent the fundamental business entities and are shared between
//! the orchestrator (which persists and mutates them) and clients (which display them).

pub mod job;
pub mod playbook;
