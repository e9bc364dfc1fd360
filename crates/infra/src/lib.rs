//! # Beacon Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The SQLite-backed call store and its connection manager
//! - The HTTP ingest client
//! - The request sender orchestration and delivery timer
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `beacon-core`
//! - Depends on `beacon-domain` and `beacon-core`
//! - Contains all "impure" code (I/O, networking, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use database::{open_call_store, DbManager, SqliteCallStore};
pub use errors::InfraError;
pub use http::HttpClient;
pub use scheduling::{DeliveryTimer, DeliveryTimerConfig, FlushTrigger};
pub use sync::{
    BatchTransport, EnqueueOutcome, FlushOutcome, IngestClient, IngestClientConfig,
    RequestSender, SyncError,
};
