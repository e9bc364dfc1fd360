//! Adaptive batch encoding.
//!
//! Builds the wire payload for one delivery attempt. Under a large backlog
//! the payload for the full queue may not fit the configured ceiling, so the
//! encoder repeatedly halves the fraction of the queue it attempts until the
//! payload fits or the fraction bottoms out. The ceiling is a pre-flight
//! size estimate standing in for an allocation failure: each halving
//! strictly shrinks the attempted size, so the loop always terminates.

use beacon_domain::constants::{params, MAX_CALLS_PER_BATCH};
use beacon_domain::{Batch, BeaconError, PendingCall, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::collapse::collapse_background_starts;
use super::ports::CallStore;

/// Fractions below this bound terminate shrinking with an empty batch.
const MIN_FRACTION: f64 = 0.01;

/// Same width as a real batch UUID, so probe payloads measure the exact
/// size of the payload that would be sent.
const PROBE_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Tuning knobs for [`BatchEncoder`].
#[derive(Debug, Clone)]
pub struct BatchEncoderConfig {
    /// Hard cap on calls per upload, regardless of queue depth.
    pub max_calls_per_batch: usize,
    /// Serialized payload ceiling in bytes; exceeding it triggers halving.
    pub max_payload_bytes: usize,
}

impl Default for BatchEncoderConfig {
    fn default() -> Self {
        Self { max_calls_per_batch: MAX_CALLS_PER_BATCH, max_payload_bytes: 2 * 1024 * 1024 }
    }
}

/// Serializes a prefix of the queue into one wire payload, shrinking
/// adaptively when the payload exceeds the configured ceiling.
#[derive(Debug, Clone, Default)]
pub struct BatchEncoder {
    config: BatchEncoderConfig,
}

impl BatchEncoder {
    pub fn new(config: BatchEncoderConfig) -> Self {
        Self { config }
    }

    /// Encode the next batch from `store`, starting at `initial_fraction` of
    /// the queue.
    ///
    /// Returns the empty batch when the store is empty or when shrinking
    /// bottoms out; the store is left untouched either way, so every call
    /// excluded here remains a candidate for the next attempt.
    pub async fn encode(&self, store: &dyn CallStore, initial_fraction: f64) -> Result<Batch> {
        let total = store.count().await?.min(self.config.max_calls_per_batch);
        let mut fraction = initial_fraction.clamp(0.0, 1.0);

        loop {
            if fraction < MIN_FRACTION {
                warn!("batch encoding exhausted: no fraction of the queue fits the payload ceiling");
                return Ok(Batch::empty());
            }

            let candidate_count = (total as f64 * fraction).floor() as usize;
            if candidate_count == 0 {
                return Ok(Batch::empty());
            }

            let unsent = store.read_prefix(candidate_count).await?;
            if unsent.is_empty() {
                return Ok(Batch::empty());
            }

            let read_count = unsent.len();
            let included_calls = collapse_background_starts(unsent);

            // Size the payload with a fixed-width probe before touching the
            // durable UUID memo: intermediate candidate sizes rejected by
            // the ceiling must not rotate the UUID of the set that is
            // eventually sent.
            let probe = encode_payload(&included_calls, PROBE_UUID)?;
            if probe.len() > self.config.max_payload_bytes {
                debug!(
                    payload_bytes = probe.len(),
                    ceiling = self.config.max_payload_bytes,
                    fraction,
                    "payload exceeds ceiling, halving candidate fraction"
                );
                fraction *= 0.5;
                continue;
            }

            let batch_uuid = store.batch_uuid(read_count).await?;
            let encoded_payload = encode_payload(&included_calls, &batch_uuid)?;

            return Ok(Batch { included_calls, read_count, batch_uuid, encoded_payload });
        }
    }
}

/// Serialize collapsed calls into the multi-call wire form.
///
/// One top-level object with a `data` array; each element carries the
/// call's action, its flattened params, the per-call request id, and the
/// batch UUID repeated so the endpoint can deduplicate at call level even
/// when batch boundaries differ between a failed and a retried attempt.
fn encode_payload(calls: &[PendingCall], batch_uuid: &str) -> Result<String> {
    let data: Vec<Value> = calls
        .iter()
        .map(|call| {
            let mut entry = call.params.clone();
            entry.insert(params::ACTION.to_string(), Value::String(call.action.clone()));
            entry.insert(params::REQUEST_ID.to_string(), Value::String(call.request_id.clone()));
            entry.insert(params::UUID.to_string(), Value::String(batch_uuid.to_string()));
            Value::Object(entry)
        })
        .collect();

    let mut envelope = Map::new();
    envelope.insert(params::DATA.to_string(), Value::Array(data));

    serde_json::to_string(&Value::Object(envelope))
        .map_err(|e| BeaconError::Encoding(format!("failed to serialize batch payload: {e}")))
}
