//! # Beacon Core
//!
//! Port interfaces and pure delivery logic for the Beacon telemetry SDK.
//!
//! This crate contains:
//! - Port traits implemented by infrastructure (call store, endpoint config,
//!   flush observers)
//! - The background-start collapser
//! - The adaptive batch encoder
//! - An in-memory call store for tests and degraded, storage-less operation
//!
//! ## Architecture
//! - Depends on `beacon-domain` only
//! - No I/O; infrastructure implements the ports defined here

pub mod queue;

pub use queue::collapse::collapse_background_starts;
pub use queue::encoder::{BatchEncoder, BatchEncoderConfig};
pub use queue::memory::MemoryCallStore;
pub use queue::ports::{CallStore, EndpointConfigProvider, FlushObserver};
