//! Core data types for the request queue and batch delivery pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::constants::{params, ACTION_START};

/// How a call should reach the network.
///
/// `Immediate` calls attempt a synchronous send right after being queued and
/// fall back to the periodic flush on failure. `Deferred` calls wait for the
/// delivery timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryClass {
    Immediate,
    Deferred,
}

/// A call as submitted by a caller, before the store assigns its position.
#[derive(Debug, Clone)]
pub struct NewCall {
    pub request_id: String,
    pub action: String,
    pub params: Map<String, Value>,
    pub delivery_class: DeliveryClass,
}

impl NewCall {
    /// Create a call with a fresh per-call request id.
    pub fn new(
        action: impl Into<String>,
        params: Map<String, Value>,
        delivery_class: DeliveryClass,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            action: action.into(),
            params,
            delivery_class,
        }
    }

    /// Whether this call is a session start issued from the background.
    ///
    /// Derived from the action and params once, at creation; the flag drives
    /// collapsing of superseded background starts.
    pub fn is_background_start(&self) -> bool {
        self.action == ACTION_START && param_is_true(self.params.get(params::BACKGROUND))
    }
}

fn param_is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text == "true",
        _ => false,
    }
}

/// One queued, not-yet-confirmed remote operation.
///
/// Appended to the store exactly once, read any number of times across flush
/// attempts, and deleted exactly once after confirmed delivery. `params` are
/// immutable once appended; collapsing and encoding may exclude a call but
/// never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCall {
    /// Monotone position assigned by the store at insertion; defines FIFO
    /// order.
    pub sequence_id: i64,
    pub request_id: String,
    pub action: String,
    pub params: Map<String, Value>,
    pub delivery_class: DeliveryClass,
    /// Derived from `params` at creation time; used only by the collapser.
    pub is_background_start: bool,
}

impl PendingCall {
    /// Attach a store-assigned sequence position to a submitted call.
    pub fn from_new(sequence_id: i64, call: NewCall) -> Self {
        let is_background_start = call.is_background_start();
        Self {
            sequence_id,
            request_id: call.request_id,
            action: call.action,
            params: call.params,
            delivery_class: call.delivery_class,
            is_background_start,
        }
    }
}

/// A selected, encoded subset of pending calls for one delivery attempt.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Collapsed calls that were actually encoded, in FIFO order.
    pub included_calls: Vec<PendingCall>,
    /// Number of store rows this batch covers, including calls the collapser
    /// dropped. Deleting a finished batch removes this many oldest rows so
    /// collapsed calls do not linger in the store.
    pub read_count: usize,
    /// Stable identifier repeated on every call so the endpoint can
    /// deduplicate a retried batch whose success acknowledgment was lost.
    pub batch_uuid: String,
    /// Serialized wire form of `included_calls`.
    pub encoded_payload: String,
}

impl Batch {
    /// The terminal batch returned when adaptive shrinking bottoms out or the
    /// store is empty: nothing to send, empty-array wire form.
    pub fn empty() -> Self {
        Self {
            included_calls: Vec::new(),
            read_count: 0,
            batch_uuid: String::new(),
            encoded_payload: format!("{{\"{}\":[]}}", params::DATA),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.included_calls.is_empty()
    }
}

/// Recognized upload intervals for the delivery timer.
///
/// Each option selects the recurring interval only; no other behavior
/// changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadInterval {
    Minutes5,
    Minutes10,
    #[default]
    Minutes15,
}

impl UploadInterval {
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.minutes() * 60)
    }

    pub fn minutes(self) -> u64 {
        match self {
            Self::Minutes5 => 5,
            Self::Minutes10 => 10,
            Self::Minutes15 => 15,
        }
    }
}

/// Destination and identity for one flush attempt.
///
/// Read from the provider at flush time; the queue never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    pub path: String,
    pub use_tls: bool,
    pub app_id: String,
    pub client_key: String,
    pub device_id: String,
    pub user_id: String,
}

impl EndpointConfig {
    /// Base URL for the collection endpoint.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host, self.path)
    }
}
