//! Request sender: the single owner of the pending-call lifecycle.
//!
//! Callers hand calls to [`RequestSender::enqueue`]; the sender appends
//! them durably, attempts an immediate send when asked to, and otherwise
//! leaves delivery to the periodic flush. At most one flush runs at a
//! time, enforced by an atomic state guard rather than a lock so a
//! skipped flush returns instantly instead of queueing behind the one in
//! flight. Rows are deleted only after the endpoint confirms receipt.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::{BatchEncoder, CallStore, EndpointConfigProvider, FlushObserver};
use beacon_domain::constants::ACTION_HEARTBEAT;
use beacon_domain::{Batch, DeliveryClass, EndpointConfig, NewCall};
use serde_json::Map;
use tracing::{debug, error, info, instrument, warn};

use super::api_client::IngestClient;
use super::errors::{SyncError, SyncErrorCategory};
use crate::scheduling::FlushTrigger;

/// Abstraction over batch upload so the sender can be tested without a
/// network and wired to [`IngestClient`] in production.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send_batch(
        &self,
        endpoint: &EndpointConfig,
        batch: &Batch,
    ) -> Result<(), SyncError>;
}

#[async_trait]
impl BatchTransport for IngestClient {
    async fn send_batch(
        &self,
        endpoint: &EndpointConfig,
        batch: &Batch,
    ) -> Result<(), SyncError> {
        IngestClient::send_batch(self, endpoint, batch).await
    }
}

/// What happened to one submitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended durably; the periodic flush will deliver it.
    Queued,
    /// Appended durably and delivered by an immediate flush.
    Flushed,
    /// Appended durably, but the immediate flush did not get it out; it
    /// stays queued for the next attempt.
    FlushFailed,
    /// Durable append failed; the call is lost and was logged.
    Dropped,
}

/// Result of one flush invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush already holds the guard; nothing was attempted.
    AlreadyInFlight,
    /// The queue was empty.
    NothingToSend,
    /// Calls are queued but no fraction of them fit the payload ceiling;
    /// everything stays queued.
    Exhausted,
    /// The backlog was drained: `delivered` calls confirmed over `batches`
    /// uploads.
    Sent { delivered: usize, batches: usize },
    /// A batch failed to go out; all unconfirmed calls stay queued.
    Failed(SyncErrorCategory),
}

const STATE_IDLE: u8 = 0;
const STATE_ENCODING: u8 = 1;
const STATE_SENDING: u8 = 2;

/// Orchestrates enqueue, batch encoding, upload, and post-success cleanup.
pub struct RequestSender {
    store: Arc<dyn CallStore>,
    transport: Arc<dyn BatchTransport>,
    endpoint: Arc<dyn EndpointConfigProvider>,
    encoder: BatchEncoder,
    observers: Vec<Arc<dyn FlushObserver>>,
    state: AtomicU8,
}

impl RequestSender {
    pub fn new(
        store: Arc<dyn CallStore>,
        transport: Arc<dyn BatchTransport>,
        endpoint: Arc<dyn EndpointConfigProvider>,
        encoder: BatchEncoder,
    ) -> Self {
        Self {
            store,
            transport,
            endpoint,
            encoder,
            observers: Vec::new(),
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    /// Register an observer notified after every flush that attempted work.
    pub fn add_observer(&mut self, observer: Arc<dyn FlushObserver>) {
        self.observers.push(observer);
    }

    /// Accept one call into the queue.
    ///
    /// Storage failures are absorbed here: the call is dropped and logged,
    /// never surfaced as an error to the submitting caller.
    #[instrument(skip(self, call), fields(action = %call.action, class = ?call.delivery_class))]
    pub async fn enqueue(&self, call: NewCall) -> EnqueueOutcome {
        let class = call.delivery_class;

        match self.store.append(call).await {
            Ok(sequence_id) => debug!(sequence_id, "call queued"),
            Err(err) => {
                error!(error = %err, "dropping call: durable append failed");
                return EnqueueOutcome::Dropped;
            }
        }

        match class {
            DeliveryClass::Deferred => EnqueueOutcome::Queued,
            DeliveryClass::Immediate => match self.flush().await {
                FlushOutcome::Sent { .. } => EnqueueOutcome::Flushed,
                // The in-flight flush (or the next periodic one) will
                // pick the call up; it is safely queued either way.
                FlushOutcome::AlreadyInFlight => EnqueueOutcome::Queued,
                _ => EnqueueOutcome::FlushFailed,
            },
        }
    }

    /// Deliver as much of the backlog as possible.
    ///
    /// Encodes and uploads batches until the queue drains, a batch fails,
    /// or shrinking bottoms out. Returns immediately when another flush is
    /// in flight.
    pub async fn flush(&self) -> FlushOutcome {
        self.flush_with_fraction(1.0).await
    }

    /// [`flush`](Self::flush) starting from a reduced candidate fraction,
    /// for callers that already know the full queue will not fit.
    pub async fn flush_with_fraction(&self, initial_fraction: f64) -> FlushOutcome {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_ENCODING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("flush skipped: another flush is in flight");
            return FlushOutcome::AlreadyInFlight;
        }

        let outcome = self.run_flush(initial_fraction).await;
        self.state.store(STATE_IDLE, Ordering::SeqCst);

        match outcome {
            FlushOutcome::Sent { .. } => self.notify_observers(true),
            FlushOutcome::Failed(_) | FlushOutcome::Exhausted => self.notify_observers(false),
            FlushOutcome::NothingToSend | FlushOutcome::AlreadyInFlight => {}
        }

        outcome
    }

    async fn run_flush(&self, initial_fraction: f64) -> FlushOutcome {
        let mut delivered = 0usize;
        let mut batches = 0usize;

        loop {
            self.state.store(STATE_ENCODING, Ordering::SeqCst);

            let batch = match self.encoder.encode(self.store.as_ref(), initial_fraction).await {
                Ok(batch) => batch,
                Err(err) => {
                    let err = SyncError::from(err);
                    error!(error = %err, "batch encoding failed");
                    return FlushOutcome::Failed(err.category());
                }
            };

            if batch.is_empty() {
                if batches > 0 {
                    return FlushOutcome::Sent { delivered, batches };
                }
                return match self.store.count().await {
                    Ok(0) => FlushOutcome::NothingToSend,
                    Ok(remaining) => {
                        warn!(remaining, "flush exhausted: no queue fraction fits the ceiling");
                        FlushOutcome::Exhausted
                    }
                    Err(err) => {
                        error!(error = %err, "failed to read queue depth");
                        FlushOutcome::Failed(SyncErrorCategory::Storage)
                    }
                };
            }

            let endpoint = match self.endpoint.current() {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    warn!(error = %err, "flush skipped: endpoint not configured");
                    return FlushOutcome::Failed(SyncErrorCategory::Config);
                }
            };

            self.state.store(STATE_SENDING, Ordering::SeqCst);

            match self.transport.send_batch(&endpoint, &batch).await {
                Ok(()) => {
                    // Confirmed by the endpoint: remove every row the batch
                    // covered, collapsed calls included. The store forgets
                    // the batch UUID in the same transaction. On delete
                    // failure the memo survives with the rows, so an
                    // eventual redelivery is deduplicated server-side.
                    if let Err(err) = self.store.delete_prefix(batch.read_count).await {
                        error!(error = %err, "delivered batch could not be deleted");
                        return FlushOutcome::Failed(SyncErrorCategory::Storage);
                    }

                    delivered += batch.included_calls.len();
                    batches += 1;
                    info!(
                        calls = batch.included_calls.len(),
                        covered_rows = batch.read_count,
                        uuid = %batch.batch_uuid,
                        "batch delivered"
                    );
                    // Keep draining whatever backlog remains.
                }
                Err(err) => {
                    if err.should_retry() {
                        warn!(error = %err, "batch upload failed, calls remain queued");
                    } else {
                        error!(error = %err, "batch upload rejected, calls remain queued");
                    }
                    return FlushOutcome::Failed(err.category());
                }
            }
        }
    }

    fn notify_observers(&self, success: bool) {
        for observer in &self.observers {
            observer.on_flush_result(success);
        }
    }
}

#[async_trait]
impl FlushTrigger for RequestSender {
    async fn tick(&self, send_heartbeat: bool) {
        if send_heartbeat {
            let heartbeat = NewCall::new(ACTION_HEARTBEAT, Map::new(), DeliveryClass::Deferred);
            self.enqueue(heartbeat).await;
        }
        self.flush().await;
    }
}
