//! File record domain model.
//!
//! # Responsibility
//! - Define the canonical metadata record for one synchronized budget file.
//! - Make the all-or-nothing key triple and the one-way tombstone explicit in
//!   the types.
//!
//! # Invariants
//! - `file_id` is assigned by the creator, immutable and never reused.
//! - `encrypt_meta` is always present once a record exists.
//! - Salt, key id and test value are either all set or all unset.
//! - `Lifecycle::Tombstoned` is never turned back into `Lifecycle::Live`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque, creator-assigned file identifier.
pub type FileId = String;

/// Tombstone state of a file record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Live,
    /// Soft deleted; still resolvable by id.
    Tombstoned,
}

impl Lifecycle {
    pub fn is_tombstoned(self) -> bool {
        matches!(self, Self::Tombstoned)
    }
}

/// Key confirmation values a client uses to check a passphrase-derived key.
///
/// The server never interprets these strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKey {
    pub salt: String,
    pub key_id: String,
    pub test: String,
}

impl EncryptionKey {
    pub fn new(
        salt: impl Into<String>,
        key_id: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self {
            salt: salt.into(),
            key_id: key_id.into(),
            test: test.into(),
        }
    }
}

/// Creation input for a file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    pub file_id: FileId,
    /// Empty when the file is not bound to a sync group yet.
    pub group_id: String,
    pub sync_version: u64,
    pub encrypt_meta: String,
    pub name: String,
}

/// Validation failures for file records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileValidationError {
    #[error("file id must not be blank")]
    EmptyFileId,
}

impl NewFile {
    pub fn new(
        file_id: impl Into<FileId>,
        group_id: impl Into<String>,
        sync_version: u64,
        encrypt_meta: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            group_id: group_id.into(),
            sync_version,
            encrypt_meta: encrypt_meta.into(),
            name: name.into(),
        }
    }

    /// Validates creator-supplied fields before persistence.
    pub fn validate(&self) -> Result<(), FileValidationError> {
        if self.file_id.trim().is_empty() {
            return Err(FileValidationError::EmptyFileId);
        }
        Ok(())
    }
}

/// Durable metadata for one synchronized budget file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: FileId,
    pub group_id: String,
    pub sync_version: u64,
    pub encrypt_meta: String,
    /// `None` until a client confirms its key for the first time.
    pub encryption: Option<EncryptionKey>,
    pub name: String,
    pub lifecycle: Lifecycle,
}

impl FileRecord {
    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_tombstoned()
    }

    /// Returns the sync group, or `None` when the file is unbound.
    pub fn group(&self) -> Option<&str> {
        if self.group_id.is_empty() {
            None
        } else {
            Some(self.group_id.as_str())
        }
    }
}

impl From<NewFile> for FileRecord {
    fn from(value: NewFile) -> Self {
        Self {
            file_id: value.file_id,
            group_id: value.group_id,
            sync_version: value.sync_version,
            encrypt_meta: value.encrypt_meta,
            encryption: None,
            name: value.name,
            lifecycle: Lifecycle::Live,
        }
    }
}
