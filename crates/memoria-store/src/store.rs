// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use memoria_kernel::StoreFailure;
use rusqlite::Connection;
use tracing::debug;

/// The single-process transactional store (§4.2).
///
/// Wraps one `rusqlite::Connection` behind a mutex: reads and writes on the
/// same connection give read-your-writes isolation for free, and all higher
/// crates (temporal log, LTM tree, worker registry, task/alarm store,
/// session store) share one `Store` handle rather than opening their own
/// connections, so writes serialize across the whole engine as §5 requires.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) a store file on disk, applying the pragmas the
    /// teacher's memory crate relies on implicitly through `bundled` SQLite
    /// defaults, made explicit here so behavior doesn't depend on the
    /// platform's system SQLite.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreFailure> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoreFailure::io_failure(format!("opening store: {e}")))?;
        Self::configure(&conn)?;
        debug!(path = %path.as_ref().display(), "store opened");
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory mode for tests (§4.2): schema is initialized from scratch by
    /// whichever crate's `migrate` runs against it, exactly as on disk.
    pub fn open_in_memory() -> Result<Self, StoreFailure> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreFailure::io_failure(format!("opening in-memory store: {e}")))?;
        Self::configure(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn configure(conn: &Connection) -> Result<(), StoreFailure> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
            .map_err(|e| StoreFailure::schema_error(format!("configuring pragmas: {e}")))?;
        Ok(())
    }

    /// Run a schema migration statement batch. Idempotent `CREATE TABLE IF
    /// NOT EXISTS` / `CREATE INDEX IF NOT EXISTS` statements are expected;
    /// called once per owning crate on open (§6 "Persisted state").
    pub fn migrate(&self, schema_sql: &str) -> Result<(), StoreFailure> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(schema_sql)
            .map_err(|e| StoreFailure::schema_error(format!("migration failed: {e}")))
    }

    /// Direct access to the underlying connection for crate-specific SQL.
    /// Kept intentionally low-level, mirroring the teacher's memory crate
    /// where `db.rs` defines the schema and `manager.rs` runs raw SQL
    /// against a shared `Connection` rather than hiding it behind an ORM.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Run `f` inside a SQLite transaction, committing on `Ok` and rolling
    /// back on `Err`. Used by write operations that touch more than one
    /// table atomically (e.g. LTM rename updating descendant paths, §4.4).
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> rusqlite::Result<T>,
    ) -> Result<T, StoreFailure> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| StoreFailure::io_failure(format!("starting transaction: {e}")))?;
        let result = f(&tx).map_err(map_rusqlite_err)?;
        tx.commit()
            .map_err(|e| StoreFailure::io_failure(format!("committing transaction: {e}")))?;
        Ok(result)
    }
}

/// Maps a raw `rusqlite::Error` onto the four kinds from §4.2. Constraint
/// violations (unique slug, foreign key) surface as `conflict`; everything
/// else is an `io_failure` since rusqlite doesn't distinguish further.
pub fn map_rusqlite_err(e: rusqlite::Error) -> StoreFailure {
    match &e {
        rusqlite::Error::QueryReturnedNoRows => StoreFailure::not_found(e.to_string()),
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreFailure::conflict(e.to_string())
        }
        _ => StoreFailure::io_failure(e.to_string()),
    }
}
