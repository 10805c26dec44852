//! File registry use-case service.
//!
//! # Responsibility
//! - Provide the entry points a route handler needs for sync endpoints.
//! - Apply bounded busy retry around every registry call.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Registry errors other than lock contention are returned unchanged.

use crate::model::file::{EncryptionKey, FileRecord, NewFile};
use crate::repo::file_repo::{DeleteMode, FileRepository, RepoError, RepoResult};
use crate::service::retry::{retry_on_busy, RetryPolicy};
use log::info;

/// Result of recording an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    Updated,
}

/// Use-case service wrapper for file registry operations.
pub struct FileService<R: FileRepository> {
    repo: R,
    retry: RetryPolicy,
}

impl<R: FileRepository> FileService<R> {
    /// Creates a service with the default retry policy.
    pub fn new(repo: R) -> Self {
        Self::with_retry(repo, RetryPolicy::default())
    }

    pub fn with_retry(repo: R, retry: RetryPolicy) -> Self {
        Self { repo, retry }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn count(&self) -> RepoResult<u64> {
        retry_on_busy(&self.retry, "count", || self.repo.count())
    }

    pub fn file_info(&self, id: &str) -> RepoResult<FileRecord> {
        retry_on_busy(&self.retry, "for_id", || self.repo.for_id(id))
    }

    /// Lists every record, tombstones included.
    pub fn list_files(&self) -> RepoResult<Vec<FileRecord>> {
        retry_on_busy(&self.retry, "all", || self.repo.all())
    }

    /// Lists records that are not tombstoned.
    pub fn list_live_files(&self) -> RepoResult<Vec<FileRecord>> {
        let files = self.list_files()?;
        Ok(files.into_iter().filter(|file| !file.is_deleted()).collect())
    }

    /// Records an uploaded file: replaces content metadata of an existing
    /// record, or adds a new one.
    ///
    /// # Contract
    /// - Existing record: sync version, encryption meta and name are replaced;
    ///   group, key and tombstone state are kept.
    /// - Unknown id: a live record is created from `upload`.
    /// - Concurrent first uploads of one id: one caller creates, the others
    ///   update the created record.
    pub fn record_upload(&self, upload: &NewFile) -> RepoResult<UploadOutcome> {
        upload.validate()?;

        let update = || {
            retry_on_busy(&self.retry, "update", || {
                self.repo.update(
                    &upload.file_id,
                    upload.sync_version,
                    &upload.encrypt_meta,
                    &upload.name,
                )
            })
        };

        match update() {
            Ok(()) => Ok(UploadOutcome::Updated),
            Err(RepoError::NoRecordUpdated(_)) => {
                match retry_on_busy(&self.retry, "add", || self.repo.add(upload)) {
                    Ok(()) => {
                        info!(
                            "event=file_upload module=service status=ok outcome=created file_id={}",
                            upload.file_id
                        );
                        Ok(UploadOutcome::Created)
                    }
                    // Another caller created the same id between our update and add.
                    Err(err) if err.is_duplicate_key() => {
                        update()?;
                        Ok(UploadOutcome::Updated)
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn rename(&self, id: &str, name: &str) -> RepoResult<()> {
        retry_on_busy(&self.retry, "update_name", || self.repo.update_name(id, name))
    }

    /// Binds the file to a sync group.
    pub fn assign_group(&self, id: &str, group_id: &str) -> RepoResult<()> {
        retry_on_busy(&self.retry, "update_group", || {
            self.repo.update_group(id, group_id)
        })
    }

    /// Abandons the file's sync group so devices start a fresh cycle.
    pub fn reset_sync_group(&self, id: &str) -> RepoResult<()> {
        retry_on_busy(&self.retry, "clear_group", || self.repo.clear_group(id))
    }

    /// Stores the client's key confirmation values (first time or rotation).
    pub fn confirm_encryption(&self, id: &str, key: &EncryptionKey) -> RepoResult<()> {
        retry_on_busy(&self.retry, "update_encryption", || {
            self.repo.update_encryption(id, key)
        })
    }

    /// Tombstones the file.
    pub fn delete_file(&self, id: &str) -> RepoResult<()> {
        retry_on_busy(&self.retry, "delete", || self.repo.delete(id))
    }

    /// Atomically tombstones the file and returns its prior state.
    ///
    /// When several callers race, only one receives a `Live` snapshot.
    pub fn claim_for_reset(&self, id: &str) -> RepoResult<FileRecord> {
        retry_on_busy(&self.retry, "for_id_and_delete", || {
            self.repo.for_id_and_delete(id, DeleteMode::Soft)
        })
    }

    /// Permanently removes the file and returns its last state.
    pub fn purge_file(&self, id: &str) -> RepoResult<FileRecord> {
        retry_on_busy(&self.retry, "for_id_and_delete", || {
            self.repo.for_id_and_delete(id, DeleteMode::Hard)
        })
    }
}
