//! Configuration structures for the delivery pipeline.

use serde::{Deserialize, Serialize};

use crate::types::{EndpointConfig, UploadInterval};

/// Top-level configuration assembled by the infra loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub delivery: DeliveryConfig,
    pub endpoint: EndpointConfig,
}

/// Durable store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite file holding pending calls.
    pub path: String,
}

/// Periodic flush settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub upload_interval: UploadInterval,
    /// Enqueue a heartbeat call on every timer tick so an otherwise idle
    /// session still reaches the endpoint.
    #[serde(default = "default_send_heartbeat")]
    pub send_heartbeat: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { upload_interval: UploadInterval::default(), send_heartbeat: true }
    }
}

fn default_send_heartbeat() -> bool {
    true
}
