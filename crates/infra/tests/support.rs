use std::path::PathBuf;
use std::sync::Arc;

use beacon_domain::constants::{params, ACTION_START};
use beacon_domain::{DeliveryClass, EndpointConfig, NewCall};
use beacon_infra::database::{DbManager, SqliteCallStore};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying directory alive
/// for the duration of a test and can reopen the same file to simulate a
/// process restart.
pub struct TestDatabase {
    temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self { temp_dir: TempDir::new().expect("temp dir should be created") }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("queue.db")
    }

    /// Open (or reopen) a call store over this database file.
    pub fn open_store(&self) -> Arc<SqliteCallStore> {
        let manager = DbManager::new(self.db_path()).expect("db manager should open");
        Arc::new(SqliteCallStore::new(Arc::new(manager)).expect("call store should open"))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn deferred_call(action: &str) -> NewCall {
    let mut map = Map::new();
    map.insert("source".to_string(), json!("integration-test"));
    NewCall::new(action, map, DeliveryClass::Deferred)
}

pub fn background_start() -> NewCall {
    let mut map = Map::new();
    map.insert(params::BACKGROUND.to_string(), json!("true"));
    NewCall::new(ACTION_START, map, DeliveryClass::Deferred)
}

/// Endpoint identity pointing at a wiremock server.
pub fn endpoint_for(server_uri: &str) -> EndpointConfig {
    let stripped = server_uri.trim_start_matches("http://");
    EndpointConfig {
        host: stripped.to_string(),
        path: "/api".to_string(),
        use_tls: false,
        app_id: "app-integration".to_string(),
        client_key: "key-integration".to_string(),
        device_id: "device-integration".to_string(),
        user_id: "user-integration".to_string(),
    }
}

/// Extract the inner call list from one multi-call upload body.
pub fn calls_in_body(body: &[u8]) -> Vec<Value> {
    let envelope: Value = serde_json::from_slice(body).expect("upload body should be JSON");
    let payload = envelope["data"].as_str().expect("data should be an encoded string");
    let inner: Value = serde_json::from_str(payload).expect("payload should be JSON");
    inner["data"].as_array().expect("payload should hold a data array").clone()
}
