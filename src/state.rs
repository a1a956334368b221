//! Shared application state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::relay::bridge::RelayConfig;
use crate::core::relay::greeting::Greeting;
use crate::core::relay::tools::ToolRegistry;
use crate::core::relay::upstream::{StaticTokenProvider, UpstreamConfig, UpstreamCredentials};
use crate::errors::{ConfigError, RelayResult};

/// State shared across all handlers, built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Loaded server configuration
    pub config: Arc<ServerConfig>,
    /// Everything a bridge needs per call
    pub relay: RelayConfig,
}

impl AppState {
    /// Assemble state from configuration and the registered tools.
    ///
    /// A config without any upstream credential is rejected here as well as
    /// at load time, so states assembled from hand-built configs cannot end
    /// up with an empty token.
    ///
    /// A configured but unreadable greeting file disables the greeting with a
    /// warning rather than refusing to start.
    pub fn new(config: ServerConfig, tools: ToolRegistry) -> Result<Self, ConfigError> {
        let credentials = match (&config.api_key, &config.bearer_token) {
            (Some(key), _) => UpstreamCredentials::ApiKey(key.clone()),
            (None, Some(token)) => {
                UpstreamCredentials::Bearer(Arc::new(StaticTokenProvider::new(token.clone())))
            }
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "MODEL_API_KEY or MODEL_BEARER_TOKEN",
                ));
            }
        };

        let upstream = UpstreamConfig {
            endpoint: config.model_endpoint.clone(),
            deployment: config.model_deployment.clone(),
            api_version: config.api_version.clone(),
            credentials,
        };

        let greeting = config.greeting_audio_path.as_ref().and_then(|path| {
            match Greeting::load(path) {
                Ok(greeting) => {
                    info!(path = %path.display(), "Greeting audio loaded");
                    Some(greeting)
                }
                Err(e) => {
                    warn!(path = %path.display(), "Greeting audio unavailable, disabling: {e}");
                    None
                }
            }
        });

        let relay = RelayConfig {
            upstream,
            policy: Arc::new(config.policy.clone()),
            tools: Arc::new(tools),
            greeting,
        };

        Ok(AppState {
            config: Arc::new(config),
            relay,
        })
    }

    /// Warm up the upstream credential path before accepting calls.
    pub async fn warm_up(&self) -> RelayResult<()> {
        self.relay.upstream.warm_up().await
    }
}

// =============================================================================
// Tests
// =============================================================================
