//! # Beacon Domain
//!
//! Business domain types and models for the Beacon telemetry SDK.
//!
//! This crate contains:
//! - Pending-call and batch data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Wire-protocol constants
//!
//! ## Architecture
//! - No dependencies on other Beacon crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
