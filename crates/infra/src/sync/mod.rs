//! Batch delivery: the ingest client and the request sender that
//! orchestrates enqueue, encode, send, and post-success cleanup.

pub mod api_client;
pub mod errors;
pub mod sender;

pub use api_client::{IngestClient, IngestClientConfig};
pub use errors::{SyncError, SyncErrorCategory};
pub use sender::{BatchTransport, EnqueueOutcome, FlushOutcome, RequestSender};
