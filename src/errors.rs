//! Error types for the relay.

use thiserror::Error;

/// Errors surfaced by the relay itself.
///
/// Peer disconnects are deliberately not represented here: either side
/// closing mid-call is a normal termination, not an error.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Establishing the upstream model connection failed; the call is not
    /// bridged and the failure is reported to the admission boundary.
    #[error("upstream connection failed: {0}")]
    UpstreamConnectionFailed(String),

    /// The upstream endpoint URL could not be built.
    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(String),

    /// Acquiring a bearer token failed.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(String),
}

/// Configuration loading/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing.
    #[error("missing required configuration: {0}")]
    MissingVar(&'static str),

    /// A variable is present but unparseable.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// The YAML configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML configuration file could not be parsed.
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
