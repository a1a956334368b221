//! Upstream model endpoint: URL building, credentials, connection.
//!
//! One model connection is opened per call; there is no pooling and no
//! reconnection. A failure to connect is fatal for that call and is reported
//! back to the admission boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::errors::{RelayError, RelayResult};

/// Protocol version attached to every upstream connection.
pub const DEFAULT_API_VERSION: &str = "2024-10-01-preview";

/// WebSocket path of the realtime endpoint.
const REALTIME_PATH: &str = "/openai/realtime";

/// Connected upstream socket type.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Source of bearer tokens for the upstream connection.
///
/// Implementations are expected to cache: `token()` is called once per call
/// setup and once at startup to warm the cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently valid bearer token.
    async fn token(&self) -> RelayResult<String>;
}

/// Token provider backed by a fixed token handed to the process.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap an externally acquired token.
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenProvider {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> RelayResult<String> {
        Ok(self.token.clone())
    }
}

/// How the relay authenticates against the model endpoint.
#[derive(Clone)]
pub enum UpstreamCredentials {
    /// Static credential sent as an `api-key` header
    ApiKey(String),
    /// Bearer token obtained from a provider warmed up at startup
    Bearer(Arc<dyn TokenProvider>),
}

impl std::fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("UpstreamCredentials::ApiKey(..)"),
            Self::Bearer(_) => f.write_str("UpstreamCredentials::Bearer(..)"),
        }
    }
}

/// Upstream endpoint configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Endpoint base, e.g. `wss://example.openai.azure.com`
    pub endpoint: String,
    /// Deployment target attached as a query parameter
    pub deployment: String,
    /// Protocol version attached as a query parameter
    pub api_version: String,
    /// Authentication mode
    pub credentials: UpstreamCredentials,
}

impl UpstreamConfig {
    /// Build the realtime WebSocket URL with version and deployment
    /// query parameters.
    pub fn build_url(&self) -> RelayResult<Url> {
        let base = Url::parse(&self.endpoint)
            .map_err(|e| RelayError::InvalidEndpoint(e.to_string()))?;
        let mut url = base
            .join(REALTIME_PATH)
            .map_err(|e| RelayError::InvalidEndpoint(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version)
            .append_pair("deployment", &self.deployment);
        Ok(url)
    }

    /// Warm up the credential path so the first call does not pay the
    /// token-acquisition latency.
    pub async fn warm_up(&self) -> RelayResult<()> {
        if let UpstreamCredentials::Bearer(provider) = &self.credentials {
            provider.token().await?;
            tracing::info!("Upstream bearer token warmed up");
        }
        Ok(())
    }

    /// Open the model connection for one call.
    ///
    /// Any failure here means the call is not bridged; the caller surfaces it
    /// as an admission failure.
    pub async fn connect(&self) -> RelayResult<UpstreamSocket> {
        let url = self.build_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::UpstreamConnectionFailed(e.to_string()))?;

        match &self.credentials {
            UpstreamCredentials::ApiKey(key) => {
                request.headers_mut().insert(
                    "api-key",
                    key.parse().map_err(|_| {
                        RelayError::UpstreamConnectionFailed("invalid api key header".to_string())
                    })?,
                );
            }
            UpstreamCredentials::Bearer(provider) => {
                let token = provider.token().await?;
                request.headers_mut().insert(
                    http::header::AUTHORIZATION,
                    format!("Bearer {token}").parse().map_err(|_| {
                        RelayError::UpstreamConnectionFailed("invalid bearer header".to_string())
                    })?,
                );
            }
        }

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| RelayError::UpstreamConnectionFailed(e.to_string()))?;

        tracing::info!(deployment = %self.deployment, "Connected to model endpoint");
        Ok(socket)
    }
}

// =============================================================================
// Tests
// =============================================================================
