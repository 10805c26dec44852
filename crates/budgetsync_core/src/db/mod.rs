//! SQLite storage bootstrap, schema migration and the shared connection handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the file registry.
//! - Apply schema migrations in deterministic order.
//! - Hand out one shared connection handle to every store.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Registry code must not read/write file records before migrations succeed.
//! - Connection failures are surfaced unchanged, never retried here.

use thiserror::Error;

mod connection;
pub mod migrations;
mod open;

pub use connection::SharedConnection;
pub use open::{open_db, open_db_in_memory, open_db_with_busy_timeout, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("shared connection lock was poisoned by a panicking holder")]
    Poisoned,
    #[error("shared connection is still held by {holders} other handle(s)")]
    ConnectionInUse { holders: usize },
}

impl DbError {
    /// Returns whether this error is SQLite reporting a busy or locked database.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Returns whether this error is a primary key or unique constraint failure.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            ),
            _ => false,
        }
    }
}
