//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate context calls into use-case level APIs.
//! - Keep callers decoupled from change-tracking details.

pub mod student_service;
