//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate registry calls into use-case level APIs.
//! - Keep transport layers decoupled from storage details.

pub mod file_service;
pub mod retry;
