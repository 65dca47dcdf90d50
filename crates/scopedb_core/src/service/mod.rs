//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own session lifecycle: each use case runs in exactly one scope.

pub mod blog_service;
