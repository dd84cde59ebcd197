//! Domain model for task editing.
//!
//! # Responsibility
//! - Define the canonical task record shared by store, repository and
//!   reminder components.
//! - Define the field-edit payloads and change events exchanged between
//!   editors and coordinators.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod task;
