//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into typed, use-case level APIs.
//! - Keep CLI and application layers decoupled from storage details.

pub mod record_service;
