//! Runtime source of the endpoint identity.
//!
//! App identity may arrive after the queue is already accepting calls;
//! the provider is read at flush time, so calls queued before identity is
//! set simply wait in the store until a flush can succeed.

use std::sync::RwLock;

use beacon_core::EndpointConfigProvider;
use beacon_domain::{BeaconError, EndpointConfig, Result};

/// Endpoint provider backed by an updatable in-process slot.
#[derive(Debug, Default)]
pub struct StaticEndpointProvider {
    inner: RwLock<Option<EndpointConfig>>,
}

impl StaticEndpointProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(config: EndpointConfig) -> Self {
        Self { inner: RwLock::new(Some(config)) }
    }

    /// Install or replace the endpoint identity.
    pub fn set(&self, config: EndpointConfig) -> Result<()> {
        let mut slot = self
            .inner
            .write()
            .map_err(|_| BeaconError::Internal("endpoint config lock poisoned".into()))?;
        *slot = Some(config);
        Ok(())
    }
}

impl EndpointConfigProvider for StaticEndpointProvider {
    fn current(&self) -> Result<EndpointConfig> {
        let slot = self
            .inner
            .read()
            .map_err(|_| BeaconError::Internal("endpoint config lock poisoned".into()))?;
        slot.clone()
            .ok_or_else(|| BeaconError::Config("endpoint identity is not configured yet".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(app_id: &str) -> EndpointConfig {
        EndpointConfig {
            host: "ingest.test".into(),
            path: "/api".into(),
            use_tls: true,
            app_id: app_id.into(),
            client_key: "key".into(),
            device_id: "device".into(),
            user_id: "user".into(),
        }
    }

    #[test]
    fn unset_provider_reports_a_config_error() {
        let provider = StaticEndpointProvider::new();
        assert!(matches!(provider.current(), Err(BeaconError::Config(_))));
    }

    #[test]
    fn set_replaces_the_identity() {
        let provider = StaticEndpointProvider::new();
        provider.set(endpoint("first")).unwrap();
        assert_eq!(provider.current().unwrap().app_id, "first");

        provider.set(endpoint("second")).unwrap();
        assert_eq!(provider.current().unwrap().app_id, "second");
    }
}
