//! Database connection management.
//!
//! A single-connection r2d2 pool backs the call store: every storage
//! operation checks out the one connection, which serializes reads and
//! writes without an explicit task queue.

use std::fs;
use std::path::Path;
use std::time::Duration;

use beacon_domain::{BeaconError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::errors::{is_corruption, InfraError};

/// Manages the SQLite database file and its connection pool.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
}

impl DbManager {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// A corrupted database file is discarded and recreated empty: queued
    /// telemetry is lost, but the queue keeps accepting new calls instead
    /// of failing every operation until someone deletes the file by hand.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BeaconError::Storage(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        if let Err(err) = Self::prepare(path) {
            if is_corruption(&err) {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "database file is corrupted, discarding and recreating empty"
                );
                Self::discard(path)?;
                Self::prepare(path).map_err(InfraError::from)?;
            } else {
                return Err(InfraError::from(err).into());
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(InfraError::from)?;

        info!(path = %path.display(), "database ready");
        Ok(Self { pool })
    }

    /// Check out the pooled connection.
    pub fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }

    /// Verify the database responds to a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(InfraError::from)?;
        Ok(())
    }

    /// Open the file directly, apply the schema, and probe a read so a
    /// corrupted header is detected before the pool is built.
    fn prepare(path: &Path) -> rusqlite::Result<()> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.query_row("SELECT COUNT(*) FROM pending_call", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Remove the database file along with its WAL sidecars.
    fn discard(path: &Path) -> Result<()> {
        let mut victims = vec![path.to_path_buf()];
        for suffix in ["-wal", "-shm"] {
            let mut os = path.as_os_str().to_os_string();
            os.push(suffix);
            victims.push(os.into());
        }

        for victim in victims {
            match fs::remove_file(&victim) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(BeaconError::Storage(format!(
                        "failed to remove corrupted database file {}: {e}",
                        victim.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn creates_database_and_passes_health_check() {
        let dir = TempDir::new().unwrap();
        let db = DbManager::new(dir.path().join("queue.db")).unwrap();
        db.health_check().unwrap();
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("queue.db");
        DbManager::new(&nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn recreates_corrupted_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.db");
        fs::write(&path, b"this is not a sqlite database, not even close").unwrap();

        let db = DbManager::new(&path).unwrap();
        db.health_check().unwrap();

        let conn = db.get_connection().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_call", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }
}
