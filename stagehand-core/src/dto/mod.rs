//! Data Transfer Objects for the orchestrator HTTP API
//!
//! Request and response bodies exchanged between the orchestrator and its
//! clients (dashboard, CLI). Every optional field is serialized as an explicit
//! `null` so that clients can rely on a stable shape.

pub mod job;
pub mod playbook;
pub mod service;
