//! HTTP client for the telemetry ingest endpoint.
//!
//! Wraps one encoded batch in the multi-call envelope and maps the
//! response status into the delivery error taxonomy. Transient transport
//! failures are retried inside [`HttpClient`]; this layer only classifies
//! the final result.

use std::time::Duration;

use beacon_domain::constants::{params, ACTION_MULTI, SDK_VERSION};
use beacon_domain::{Batch, EndpointConfig};
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::errors::SyncError;
use crate::http::HttpClient;

/// Configuration for [`IngestClient`].
#[derive(Debug, Clone)]
pub struct IngestClientConfig {
    /// Deadline for one delivery attempt, transport retries included.
    pub request_timeout: Duration,
    /// Attempts per delivery (initial try + transport-level retries).
    pub max_attempts: usize,
    /// Base delay for exponential backoff between transport retries.
    pub base_backoff: Duration,
}

impl Default for IngestClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Client for uploading encoded batches.
#[derive(Clone)]
pub struct IngestClient {
    http: HttpClient,
    config: IngestClientConfig,
}

impl IngestClient {
    pub fn new(config: IngestClientConfig) -> Result<Self, SyncError> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff)
            .user_agent(format!("beacon/{SDK_VERSION}"))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Upload one batch to `endpoint`.
    ///
    /// `Ok(())` means the endpoint confirmed receipt with a 2xx; only then
    /// may the sender delete the covered rows.
    #[instrument(skip(self, endpoint, batch), fields(calls = batch.included_calls.len(), uuid = %batch.batch_uuid))]
    pub async fn send_batch(
        &self,
        endpoint: &EndpointConfig,
        batch: &Batch,
    ) -> Result<(), SyncError> {
        let url = endpoint.base_url();
        let body = envelope(endpoint, batch);

        let request = self.http.request(Method::POST, &url).json(&body);
        let send = self.http.send(request);

        let response = match tokio::time::timeout(self.config.request_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(SyncError::from(err)),
            Err(_) => {
                warn!(%url, "batch upload timed out");
                return Err(SyncError::Timeout(self.config.request_timeout));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(%status, "batch accepted");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(classify_status(status, &detail))
    }
}

/// Build the multi-call upload envelope.
///
/// App identity and timing travel at the top level; the queue's encoded
/// payload travels as an opaque string under `data`, exactly as encoded,
/// so the bytes the endpoint deduplicates on never vary between retries.
fn envelope(endpoint: &EndpointConfig, batch: &Batch) -> Value {
    let mut body = Map::new();
    body.insert(params::ACTION.into(), Value::String(ACTION_MULTI.into()));
    body.insert(params::TIME.into(), Value::String(Utc::now().timestamp().to_string()));
    body.insert(params::APP_ID.into(), Value::String(endpoint.app_id.clone()));
    body.insert(params::CLIENT_KEY.into(), Value::String(endpoint.client_key.clone()));
    body.insert(params::DEVICE_ID.into(), Value::String(endpoint.device_id.clone()));
    body.insert(params::USER_ID.into(), Value::String(endpoint.user_id.clone()));
    body.insert(params::SDK_VERSION.into(), Value::String(SDK_VERSION.into()));
    body.insert(params::DATA.into(), Value::String(batch.encoded_payload.clone()));
    Value::Object(body)
}

fn classify_status(status: StatusCode, detail: &str) -> SyncError {
    let message = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimit(message),
        StatusCode::REQUEST_TIMEOUT => SyncError::Server(message),
        s if s.is_server_error() => SyncError::Server(message),
        _ => SyncError::Client(message),
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{BatchEncoder, CallStore, MemoryCallStore};
    use beacon_domain::{DeliveryClass, NewCall};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_endpoint(server: &MockServer) -> EndpointConfig {
        let address = server.address();
        EndpointConfig {
            host: format!("{}:{}", address.ip(), address.port()),
            path: "/api".into(),
            use_tls: false,
            app_id: "app-123".into(),
            client_key: "key-456".into(),
            device_id: "device-1".into(),
            user_id: "user-1".into(),
        }
    }

    fn test_client() -> IngestClient {
        IngestClient::new(IngestClientConfig {
            base_backoff: Duration::from_millis(5),
            ..IngestClientConfig::default()
        })
        .unwrap()
    }

    async fn encoded_batch() -> Batch {
        let store = MemoryCallStore::new();
        store
            .append(NewCall::new("track", Map::new(), DeliveryClass::Deferred))
            .await
            .unwrap();
        BatchEncoder::default().encode(&store, 1.0).await.unwrap()
    }

    #[tokio::test]
    async fn successful_upload_carries_identity_and_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let batch = encoded_batch().await;
        test_client().send_batch(&test_endpoint(&server), &batch).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["action"], "multi");
        assert_eq!(body["appId"], "app-123");
        assert_eq!(body["clientKey"], "key-456");
        assert_eq!(body["data"], Value::String(batch.encoded_payload.clone()));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let batch = encoded_batch().await;
        let err = test_client().send_batch(&test_endpoint(&server), &batch).await.unwrap_err();

        assert!(matches!(err, SyncError::Auth(_)));
        assert!(!err.should_retry());
    }

    #[tokio::test]
    async fn persistent_server_error_maps_to_retryable_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let batch = encoded_batch().await;
        let err = test_client().send_batch(&test_endpoint(&server), &batch).await.unwrap_err();

        assert!(matches!(err, SyncError::Server(_)));
        assert!(err.should_retry());
    }
}
