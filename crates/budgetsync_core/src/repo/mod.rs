//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the file registry data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `NewFile::validate()` before persistence.
//! - Repository APIs return semantic errors (`RecordNotFound`,
//!   `NoRecordUpdated`) in addition to DB transport errors.

pub mod file_repo;
