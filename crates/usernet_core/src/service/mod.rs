//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the popularity score formula and the derived graph views.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod projection;
pub mod score;
pub mod user_service;
