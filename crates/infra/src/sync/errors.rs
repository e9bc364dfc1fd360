//! Delivery error taxonomy.
//!
//! Every failure of a flush attempt lands in one of these variants so the
//! sender can decide, without string matching, whether the queued calls
//! should stay put for a later retry (they always do, deletion happens
//! only after a confirmed 2xx) and what to log.

use std::time::Duration;

use beacon_domain::BeaconError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Endpoint rejected the app credentials (HTTP 401/403).
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Endpoint asked us to slow down (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Endpoint-side failure (HTTP 5xx or 408).
    #[error("server error: {0}")]
    Server(String),

    /// Request was malformed from the endpoint's point of view (other 4xx).
    #[error("client error: {0}")]
    Client(String),

    /// Transport never produced a response (DNS, connect, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Local durable storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// No payload fraction fit the encoding ceiling.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// App identity or endpoint settings are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse grouping used in flush outcomes and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    Authentication,
    RateLimit,
    Server,
    Client,
    Network,
    Storage,
    Encoding,
    Config,
}

impl SyncError {
    pub fn category(&self) -> SyncErrorCategory {
        match self {
            Self::Auth(_) => SyncErrorCategory::Authentication,
            Self::RateLimit(_) => SyncErrorCategory::RateLimit,
            Self::Server(_) => SyncErrorCategory::Server,
            Self::Client(_) => SyncErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => SyncErrorCategory::Network,
            Self::Storage(_) => SyncErrorCategory::Storage,
            Self::Encoding(_) => SyncErrorCategory::Encoding,
            Self::Config(_) => SyncErrorCategory::Config,
        }
    }

    /// Whether a later flush of the same calls can reasonably succeed
    /// without operator intervention.
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            Self::Server(_)
                | Self::Network(_)
                | Self::Timeout(_)
                | Self::RateLimit(_)
                | Self::Storage(_)
        )
    }
}

impl From<BeaconError> for SyncError {
    fn from(value: BeaconError) -> Self {
        match value {
            BeaconError::Auth(msg) => Self::Auth(msg),
            BeaconError::Network(msg) => Self::Network(msg),
            BeaconError::Storage(msg) => Self::Storage(msg),
            BeaconError::Encoding(msg) => Self::Encoding(msg),
            BeaconError::Config(msg) => Self::Config(msg),
            BeaconError::InvalidInput(msg) | BeaconError::NotFound(msg) => Self::Client(msg),
            BeaconError::Internal(msg) => Self::Server(msg),
        }
    }
}
