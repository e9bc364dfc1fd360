//! SQLite persistence for the pending-call queue.

pub mod call_store;
pub mod manager;

pub use call_store::SqliteCallStore;
pub use manager::DbManager;

use std::path::Path;
use std::sync::Arc;

use beacon_core::{CallStore, MemoryCallStore};
use tracing::warn;

/// Open the durable call store at `path`, falling back to a memory-only
/// queue when no database can be opened there.
///
/// Corruption is already handled below this (a corrupted file is discarded
/// and recreated); the fallback covers the remaining failures, such as an
/// unwritable location. Calls are then held best-effort for the life of
/// the process instead of being refused outright.
pub fn open_call_store(path: impl AsRef<Path>) -> Arc<dyn CallStore> {
    let path = path.as_ref();
    match DbManager::new(path).and_then(|db| SqliteCallStore::new(Arc::new(db))) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "durable store unavailable, queueing calls in memory only"
            );
            Arc::new(MemoryCallStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use beacon_domain::constants::ACTION_TRACK;
    use beacon_domain::{DeliveryClass, NewCall};
    use serde_json::Map;
    use tempfile::TempDir;

    use super::*;

    fn call() -> NewCall {
        NewCall::new(ACTION_TRACK, Map::new(), DeliveryClass::Deferred)
    }

    #[tokio::test]
    async fn opens_a_durable_store_at_a_writable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.db");

        let store = open_call_store(&path);
        store.append(call()).await.unwrap();

        assert!(path.exists());
        // The queue survives a reopen, so it really is the durable store.
        drop(store);
        let reopened = open_call_store(&path);
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_memory_when_the_path_cannot_be_opened() {
        let dir = TempDir::new().unwrap();

        // A directory cannot be opened as a database file.
        let store = open_call_store(dir.path());

        store.append(call()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let calls = store.read_prefix(10).await.unwrap();
        assert_eq!(calls[0].action, ACTION_TRACK);
    }
}
