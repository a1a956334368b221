//! Server configuration.
//!
//! Configuration comes from an optional YAML file plus environment variables,
//! with YAML taking precedence over the environment and built-in defaults
//! filling the rest. A `.env` file is honored through `dotenvy` before any
//! environment lookups happen.
//!
//! # Example
//! ```rust,no_run
//! use callbridge::config::ServerConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment fallback
//! let config = ServerConfig::from_file(Path::new("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::relay::policy::SessionPolicy;
use crate::core::relay::upstream::DEFAULT_API_VERSION;
use crate::errors::ConfigError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
///
/// Contains everything needed to run the relay:
/// - listener settings (host, port)
/// - upstream model endpoint and credentials
/// - server-side session policy
/// - optional greeting audio
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Listener settings
    pub host: String,
    pub port: u16,

    /// Model endpoint base, e.g. `wss://example.openai.azure.com`
    pub model_endpoint: String,
    /// Deployment name attached to every upstream connection
    pub model_deployment: String,
    /// Upstream protocol version
    pub api_version: String,
    /// Static upstream credential; when absent a bearer token source is used
    pub api_key: Option<String>,
    /// Bearer token handed to the process, used when `api_key` is absent
    pub bearer_token: Option<String>,

    /// Session policy enforced on every call
    pub policy: SessionPolicy,

    /// Path to the greeting PCM clip, when greeting-on-connect is wanted
    pub greeting_audio_path: Option<PathBuf>,
}

/// Partial configuration loaded from a YAML file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct YamlConfig {
    server: Option<ServerYaml>,
    model: Option<ModelYaml>,
    policy: Option<SessionPolicy>,
    greeting_audio_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ServerYaml {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ModelYaml {
    endpoint: Option<String>,
    deployment: Option<String>,
    api_version: Option<String>,
    api_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(YamlConfig::default())
    }

    /// Load configuration from a YAML file, falling back to environment
    /// variables for anything the file leaves out.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let yaml: YamlConfig = serde_yaml::from_str(&contents)?;
        Self::build(yaml)
    }

    fn build(yaml: YamlConfig) -> Result<Self, ConfigError> {
        let server = yaml.server.unwrap_or_default();
        let model = yaml.model.unwrap_or_default();

        let host = server
            .host
            .or_else(|| env_var("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match server.port {
            Some(p) => p,
            None => match env_var("PORT") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "PORT",
                    value: raw,
                })?,
                None => DEFAULT_PORT,
            },
        };

        let model_endpoint = model
            .endpoint
            .or_else(|| env_var("MODEL_ENDPOINT"))
            .ok_or(ConfigError::MissingVar("MODEL_ENDPOINT"))?;
        let model_deployment = model
            .deployment
            .or_else(|| env_var("MODEL_DEPLOYMENT"))
            .ok_or(ConfigError::MissingVar("MODEL_DEPLOYMENT"))?;
        let api_version = model
            .api_version
            .or_else(|| env_var("MODEL_API_VERSION"))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let api_key = model.api_key.or_else(|| env_var("MODEL_API_KEY"));
        let bearer_token = env_var("MODEL_BEARER_TOKEN");

        if api_key.is_none() && bearer_token.is_none() {
            return Err(ConfigError::MissingVar(
                "MODEL_API_KEY or MODEL_BEARER_TOKEN",
            ));
        }

        let mut policy = yaml.policy.unwrap_or_default();
        if policy.instructions.is_none() {
            policy.instructions = env_var("SESSION_INSTRUCTIONS");
        }
        if policy.voice.is_none() {
            policy.voice = env_var("SESSION_VOICE");
        }
        if policy.temperature.is_none() {
            policy.temperature = parse_env("SESSION_TEMPERATURE")?;
        }
        if policy.max_output_tokens.is_none() {
            policy.max_output_tokens = parse_env("SESSION_MAX_OUTPUT_TOKENS")?;
        }

        let greeting_audio_path = yaml
            .greeting_audio_path
            .or_else(|| env_var("GREETING_AUDIO_PATH").map(PathBuf::from));

        Ok(ServerConfig {
            host,
            port,
            model_endpoint,
            model_deployment,
            api_version,
            api_key,
            bearer_token,
            policy,
            greeting_audio_path,
        })
    }

    /// Socket address string the listener binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

// =============================================================================
// Tests
// =============================================================================
