//! Stagehand Core
//!
//! Core types shared by the Stagehand orchestrator and its clients.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Playbook)
//! - DTOs: Request and response bodies of the orchestrator HTTP API

pub mod domain;
pub mod dto;
