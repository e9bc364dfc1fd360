//! Port interfaces for the durable queue and its collaborators.

use async_trait::async_trait;
use beacon_domain::{EndpointConfig, NewCall, PendingCall, Result};

/// Durable FIFO store of pending calls.
///
/// Implementations must serialize all operations: appends, reads, and
/// deletes execute one at a time, so the oldest-N rows read before a send
/// are exactly the rows a post-success `delete_prefix` removes.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Durably append one call and return its assigned sequence id.
    async fn append(&self, call: NewCall) -> Result<i64>;

    /// Read up to `max_count` oldest calls in FIFO order without removing
    /// them.
    async fn read_prefix(&self, max_count: usize) -> Result<Vec<PendingCall>>;

    /// Remove the `count` oldest calls after a confirmed successful send of
    /// exactly those calls.
    ///
    /// Deleting rows always changes the pending set, so implementations
    /// must forget the remembered batch UUID in the same atomic step: a
    /// later candidate set that merely matches the old size must never
    /// inherit a delivered batch's identity.
    async fn delete_prefix(&self, count: usize) -> Result<()>;

    /// Number of pending calls.
    async fn count(&self) -> Result<usize>;

    /// Batch UUID for a candidate set of `candidate_count` oldest calls.
    ///
    /// The store durably remembers the UUID together with the set size it
    /// was issued for: retrying the same set yields the same UUID, while a
    /// changed set (different size) yields a fresh one. This lets the
    /// endpoint deduplicate a batch whose success acknowledgment was lost.
    async fn batch_uuid(&self, candidate_count: usize) -> Result<String>;
}

/// Supplies the destination and credentials read at flush time.
pub trait EndpointConfigProvider: Send + Sync {
    /// Current endpoint configuration, or an error when the app identity is
    /// not yet available.
    fn current(&self) -> Result<EndpointConfig>;
}

/// Optional observer notified after each flush attempt.
///
/// Observers are registered at startup in an explicit handler table; there
/// is no dynamic discovery of collaborators.
pub trait FlushObserver: Send + Sync {
    fn on_flush_result(&self, success: bool);
}
