//! File registry core for the budget sync server.
//! This crate is the single source of truth for file metadata invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RegistryConfig};
pub use db::{DbError, SharedConnection};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::file::{EncryptionKey, FileId, FileRecord, FileValidationError, Lifecycle, NewFile};
pub use repo::file_repo::{
    DeleteMode, FileRepository, RepoError, RepoResult, SqliteFileRepository,
};
pub use service::file_service::{FileService, UploadOutcome};
pub use service::retry::{retry_on_busy, RetryPolicy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens the registry database described by `config` and wraps it in a
/// shared handle ready to be injected into stores.
pub fn open_registry(config: &RegistryConfig) -> Result<SharedConnection, DbError> {
    SharedConnection::open(&config.database_path, config.busy_timeout())
}
