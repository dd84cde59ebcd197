//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate task mutation, debounced persistence and reminder
//!   scheduling into session-level APIs.
//! - Keep UI/FFI layers decoupled from storage and platform details.

pub mod reminder;
pub mod save;
pub mod session;
pub mod store;
