//! In-memory call store.
//!
//! Backs tests and the degraded mode where durable storage cannot be
//! opened: calls are then held best-effort in memory rather than crashing
//! the host or losing telemetry entirely while the process lives.

use std::collections::VecDeque;

use async_trait::async_trait;
use beacon_domain::{NewCall, PendingCall, Result};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ports::CallStore;

#[derive(Debug, Default)]
struct MemoryState {
    calls: VecDeque<PendingCall>,
    next_sequence: i64,
    batch_uuid: Option<(String, usize)>,
}

/// FIFO call store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryCallStore {
    state: Mutex<MemoryState>,
}

impl MemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for MemoryCallStore {
    async fn append(&self, call: NewCall) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.next_sequence += 1;
        let sequence_id = state.next_sequence;
        state.calls.push_back(PendingCall::from_new(sequence_id, call));
        Ok(sequence_id)
    }

    async fn read_prefix(&self, max_count: usize) -> Result<Vec<PendingCall>> {
        let state = self.state.lock().await;
        Ok(state.calls.iter().take(max_count).cloned().collect())
    }

    async fn delete_prefix(&self, count: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        let count = count.min(state.calls.len());
        state.calls.drain(..count);
        // The pending set changed; the delivered batch's identity must not
        // leak onto whatever candidate set forms next.
        state.batch_uuid = None;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.calls.len())
    }

    async fn batch_uuid(&self, candidate_count: usize) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some((uuid, size)) = &state.batch_uuid {
            if *size == candidate_count {
                return Ok(uuid.clone());
            }
        }
        let uuid = Uuid::new_v4().to_string();
        state.batch_uuid = Some((uuid.clone(), candidate_count));
        Ok(uuid)
    }
}
