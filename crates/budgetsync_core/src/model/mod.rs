//! Domain model for the file registry.
//!
//! # Responsibility
//! - Define canonical data structures used by registry and service code.
//!
//! # Invariants
//! - Every file is identified by a stable, creator-assigned `FileId`.
//! - Deletion is represented by soft-delete tombstones; only an explicit
//!   purge removes a row.

pub mod file;
