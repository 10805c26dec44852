//! File registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide atomic operations over the canonical `files` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Each operation runs as one statement or one transaction; none partially
//!   applies.
//! - Identity lookups fail with `RecordNotFound`; mutators matching zero rows
//!   fail with `NoRecordUpdated`. The two are never merged.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{DbError, SharedConnection};
use crate::model::file::{
    EncryptionKey, FileId, FileRecord, FileValidationError, Lifecycle, NewFile,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Params, Row, TransactionBehavior};
use thiserror::Error;

const FILE_SELECT_SQL: &str = "SELECT
    id,
    group_id,
    sync_version,
    encrypt_meta,
    encrypt_salt,
    encrypt_keyid,
    encrypt_test,
    name,
    deleted
FROM files";

pub type RepoResult<T> = Result<T, RepoError>;

/// Registry error taxonomy.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Identity lookup found no record with this id.
    #[error("file not found: {0}")]
    RecordNotFound(FileId),
    /// Mutation matched zero rows.
    #[error("no file record updated for id: {0}")]
    NoRecordUpdated(FileId),
    #[error(transparent)]
    Validation(#[from] FileValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted file data: {0}")]
    InvalidData(String),
    #[error("connection schema version {actual_version} is behind required {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Returns whether the storage engine reported lock contention.
    ///
    /// Callers may retry these with backoff; everything else is final.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Db(err) => err.is_busy(),
            _ => false,
        }
    }

    /// Returns whether an insert collided with an existing file id.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Db(err) => err.is_duplicate_key(),
            _ => false,
        }
    }
}

/// What `for_id_and_delete` does to the row after reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Tombstone the record and keep the row.
    Soft,
    /// Remove the row permanently.
    Hard,
}

impl DeleteMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// Repository interface for file registry operations.
pub trait FileRepository {
    /// Total number of records, tombstoned or not.
    fn count(&self) -> RepoResult<u64>;
    /// Inserts a live record with no encryption key confirmed.
    fn add(&self, file: &NewFile) -> RepoResult<()>;
    /// Exact lookup by id, regardless of tombstone state.
    fn for_id(&self, id: &str) -> RepoResult<FileRecord>;
    /// Reads the record and deletes it in the same transaction, returning the
    /// pre-deletion snapshot.
    fn for_id_and_delete(&self, id: &str, mode: DeleteMode) -> RepoResult<FileRecord>;
    /// Every record in insertion order, tombstones included.
    fn all(&self) -> RepoResult<Vec<FileRecord>>;
    /// Replaces sync version, encryption metadata and name together.
    fn update(&self, id: &str, sync_version: u64, encrypt_meta: &str, name: &str)
        -> RepoResult<()>;
    fn update_name(&self, id: &str, name: &str) -> RepoResult<()>;
    fn update_group(&self, id: &str, group_id: &str) -> RepoResult<()>;
    /// Unbinds the record from its sync group.
    fn clear_group(&self, id: &str) -> RepoResult<()>;
    /// Sets or rotates the key confirmation triple as one value.
    fn update_encryption(&self, id: &str, key: &EncryptionKey) -> RepoResult<()>;
    /// Tombstones the record.
    fn delete(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed file registry over a shared connection handle.
#[derive(Debug, Clone)]
pub struct SqliteFileRepository {
    conn: SharedConnection,
}

impl SqliteFileRepository {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the `files` table does not exist.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        {
            let guard = conn.lock()?;
            ensure_connection_ready(&guard)?;
        }
        Ok(Self { conn })
    }

    fn execute_update(&self, id: &str, sql: &str, params: impl Params) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(sql, params)?;
        if changed == 0 {
            return Err(RepoError::NoRecordUpdated(id.to_string()));
        }
        Ok(())
    }
}

impl FileRepository for SqliteFileRepository {
    fn count(&self) -> RepoResult<u64> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn add(&self, file: &NewFile) -> RepoResult<()> {
        file.validate()?;

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO files (
                id,
                group_id,
                sync_version,
                encrypt_meta,
                name
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                file.file_id.as_str(),
                file.group_id.as_str(),
                file.sync_version,
                file.encrypt_meta.as_str(),
                file.name.as_str(),
            ],
        )?;

        Ok(())
    }

    fn for_id(&self, id: &str) -> RepoResult<FileRecord> {
        let conn = self.conn.lock()?;
        select_file(&conn, id)?.ok_or_else(|| RepoError::RecordNotFound(id.to_string()))
    }

    fn for_id_and_delete(&self, id: &str, mode: DeleteMode) -> RepoResult<FileRecord> {
        let mut conn = self.conn.lock()?;
        // IMMEDIATE takes the write lock before the read, so no other writer
        // can observe the live row between select and delete.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(snapshot) = select_file(&tx, id)? else {
            return Err(RepoError::RecordNotFound(id.to_string()));
        };

        match mode {
            DeleteMode::Soft => {
                tx.execute("UPDATE files SET deleted = 1 WHERE id = ?1;", [id])?;
            }
            DeleteMode::Hard => {
                tx.execute("DELETE FROM files WHERE id = ?1;", [id])?;
            }
        }
        tx.commit()?;

        info!(
            "event=file_delete module=repo status=ok mode={} file_id={} was_tombstoned={}",
            mode.as_str(),
            id,
            snapshot.is_deleted()
        );
        Ok(snapshot)
    }

    fn all(&self) -> RepoResult<Vec<FileRecord>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("{FILE_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut files = Vec::new();

        while let Some(row) = rows.next()? {
            files.push(parse_file_row(row)?);
        }

        Ok(files)
    }

    fn update(
        &self,
        id: &str,
        sync_version: u64,
        encrypt_meta: &str,
        name: &str,
    ) -> RepoResult<()> {
        self.execute_update(
            id,
            "UPDATE files
             SET
                sync_version = ?2,
                encrypt_meta = ?3,
                name = ?4
             WHERE id = ?1;",
            params![id, sync_version, encrypt_meta, name],
        )
    }

    fn update_name(&self, id: &str, name: &str) -> RepoResult<()> {
        self.execute_update(
            id,
            "UPDATE files SET name = ?2 WHERE id = ?1;",
            params![id, name],
        )
    }

    fn update_group(&self, id: &str, group_id: &str) -> RepoResult<()> {
        self.execute_update(
            id,
            "UPDATE files SET group_id = ?2 WHERE id = ?1;",
            params![id, group_id],
        )
    }

    fn clear_group(&self, id: &str) -> RepoResult<()> {
        self.execute_update(id, "UPDATE files SET group_id = '' WHERE id = ?1;", [id])
    }

    fn update_encryption(&self, id: &str, key: &EncryptionKey) -> RepoResult<()> {
        self.execute_update(
            id,
            "UPDATE files
             SET
                encrypt_salt = ?2,
                encrypt_keyid = ?3,
                encrypt_test = ?4
             WHERE id = ?1;",
            params![
                id,
                key.salt.as_str(),
                key.key_id.as_str(),
                key.test.as_str()
            ],
        )
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        self.execute_update(id, "UPDATE files SET deleted = 1 WHERE id = ?1;", [id])
    }
}

fn select_file(conn: &Connection, id: &str) -> RepoResult<Option<FileRecord>> {
    let mut stmt = conn.prepare(&format!("{FILE_SELECT_SQL} WHERE id = ?1;"))?;
    let row = stmt
        .query_row([id], |row| Ok(parse_file_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_file_row(row: &Row<'_>) -> RepoResult<FileRecord> {
    let file_id: String = row.get("id")?;

    let encryption = match (
        row.get::<_, Option<String>>("encrypt_salt")?,
        row.get::<_, Option<String>>("encrypt_keyid")?,
        row.get::<_, Option<String>>("encrypt_test")?,
    ) {
        (Some(salt), Some(key_id), Some(test)) => Some(EncryptionKey { salt, key_id, test }),
        (None, None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "partially set encryption key for file `{file_id}`"
            )));
        }
    };

    let lifecycle = match row.get::<_, i64>("deleted")? {
        0 => Lifecycle::Live,
        1 => Lifecycle::Tombstoned,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in files.deleted"
            )));
        }
    };

    Ok(FileRecord {
        file_id,
        group_id: row.get("group_id")?,
        sync_version: row.get("sync_version")?,
        encrypt_meta: row.get("encrypt_meta")?,
        encryption,
        name: row.get("name")?,
        lifecycle,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "files")? {
        return Err(RepoError::MissingRequiredTable("files"));
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
