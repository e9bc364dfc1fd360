//! SQLite-backed implementation of the [`CallStore`] port.
//!
//! Rows are (seq, json) pairs; seq is assigned from an in-process counter
//! seeded from MAX(seq) at startup, so FIFO order survives restarts.
//! rusqlite is synchronous, so every operation runs on the blocking pool
//! and checks out the single pooled connection, which serializes the
//! queue's reads and writes.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::CallStore;
use beacon_domain::{BeaconError, NewCall, PendingCall, Result};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};
use tracing::instrument;
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

const SQL_INSERT_CALL: &str = "INSERT INTO pending_call (seq, data) VALUES (?1, ?2)";

const SQL_SELECT_PREFIX: &str =
    "SELECT seq, data FROM pending_call ORDER BY seq ASC LIMIT ?1";

const SQL_DELETE_PREFIX: &str = "DELETE FROM pending_call WHERE seq IN \
     (SELECT seq FROM pending_call ORDER BY seq ASC LIMIT ?1)";

const SQL_COUNT_CALLS: &str = "SELECT COUNT(*) FROM pending_call";

const SQL_MAX_SEQ: &str = "SELECT COALESCE(MAX(seq), 0) FROM pending_call";

const SQL_SELECT_BATCH_UUID: &str = "SELECT uuid, size FROM batch_meta WHERE id = 1";

const SQL_UPSERT_BATCH_UUID: &str = "INSERT INTO batch_meta (id, uuid, size) VALUES (1, ?1, ?2) \
     ON CONFLICT(id) DO UPDATE SET uuid = excluded.uuid, size = excluded.size";

const SQL_CLEAR_BATCH_UUID: &str = "DELETE FROM batch_meta WHERE id = 1";

type Conn = PooledConnection<SqliteConnectionManager>;

/// Durable FIFO call store on SQLite.
#[derive(Debug, Clone)]
pub struct SqliteCallStore {
    db: Arc<DbManager>,
    next_sequence: Arc<AtomicI64>,
}

impl SqliteCallStore {
    /// Build a store over an opened database, seeding the sequence counter
    /// from the highest persisted seq.
    pub fn new(db: Arc<DbManager>) -> Result<Self> {
        let conn = db.get_connection()?;
        let max_seq: i64 = conn
            .query_row(SQL_MAX_SEQ, [], |row| row.get(0))
            .map_err(InfraError::from)?;
        drop(conn);

        Ok(Self { db, next_sequence: Arc::new(AtomicI64::new(max_seq)) })
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Conn) -> std::result::Result<T, InfraError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            op(conn)
        })
        .await
        .map_err(|e| BeaconError::Internal(format!("storage task failed to complete: {e}")))?
        .map_err(BeaconError::from)
    }
}

#[async_trait]
impl CallStore for SqliteCallStore {
    #[instrument(skip(self, call), fields(action = %call.action))]
    async fn append(&self, call: NewCall) -> Result<i64> {
        let next = Arc::clone(&self.next_sequence);
        self.run_blocking(move |conn| {
            let seq = next.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = PendingCall::from_new(seq, call);
            let data = serde_json::to_string(&pending).map_err(|e| {
                InfraError(BeaconError::Encoding(format!("failed to serialize call: {e}")))
            })?;
            conn.execute(SQL_INSERT_CALL, params![seq, data])?;
            Ok(seq)
        })
        .await
    }

    async fn read_prefix(&self, max_count: usize) -> Result<Vec<PendingCall>> {
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(SQL_SELECT_PREFIX)?;
            let rows = stmt.query_map(params![max_count as i64], map_call_row)?;
            let mut calls = Vec::new();
            for row in rows {
                calls.push(row?);
            }
            Ok(calls)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_prefix(&self, count: usize) -> Result<()> {
        self.run_blocking(move |mut conn| {
            // One transaction: the rows and the batch UUID memo must go
            // together, or a crash between the two would let a later
            // same-size candidate set reuse a delivered batch's UUID.
            let tx = conn.transaction()?;
            tx.execute(SQL_DELETE_PREFIX, params![count as i64])?;
            tx.execute(SQL_CLEAR_BATCH_UUID, [])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.run_blocking(move |conn| {
            let count: i64 = conn.query_row(SQL_COUNT_CALLS, [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    async fn batch_uuid(&self, candidate_count: usize) -> Result<String> {
        self.run_blocking(move |conn| {
            let memo: Option<(String, i64)> = conn
                .query_row(SQL_SELECT_BATCH_UUID, [], |row| Ok((row.get(0)?, row.get(1)?)))
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            if let Some((uuid, size)) = memo {
                if size == candidate_count as i64 {
                    return Ok(uuid);
                }
            }

            let uuid = Uuid::new_v4().to_string();
            conn.execute(SQL_UPSERT_BATCH_UUID, params![uuid, candidate_count as i64])?;
            Ok(uuid)
        })
        .await
    }
}

fn map_call_row(row: &Row<'_>) -> rusqlite::Result<PendingCall> {
    let seq: i64 = row.get(0)?;
    let data: String = row.get(1)?;
    let mut call: PendingCall = serde_json::from_str(&data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    call.sequence_id = seq;
    Ok(call)
}
