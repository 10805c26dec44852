//! Shared ownership handle over one migrated SQLite connection.
//!
//! # Invariants
//! - Every store receives the handle explicitly; there is no global connection.
//! - Holding the lock is the only way to run statements on the connection.
//! - `close` succeeds only for the last live handle.

use super::{open_db_in_memory, open_db_with_busy_timeout, DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Thread-safe, clonable handle to the registry database.
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens and migrates a database file.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Self> {
        open_db_with_busy_timeout(path, busy_timeout).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Acquires exclusive use of the connection for one registry operation.
    pub fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.inner.lock().map_err(|_| DbError::Poisoned)
    }

    /// Number of live handles sharing this connection.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Closes the underlying connection.
    ///
    /// # Errors
    /// - `DbError::ConnectionInUse` when other handles are still alive.
    /// - `DbError::Sqlite` when SQLite fails to finalize the connection.
    pub fn close(self) -> DbResult<()> {
        let mutex = Arc::try_unwrap(self.inner).map_err(|shared| DbError::ConnectionInUse {
            holders: Arc::strong_count(&shared) - 1,
        })?;
        // A poisoned lock still owns a valid connection; close it anyway.
        let conn = mutex
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        conn.close().map_err(|(_, err)| DbError::Sqlite(err))?;
        info!("event=db_close module=db status=ok");
        Ok(())
    }
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection")
            .field("handles", &self.handle_count())
            .finish()
    }
}
