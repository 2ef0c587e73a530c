//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("CORS origin must be an http(s) scheme and host: {0}")]
    InvalidCorsOrigin(String),

    #[error("Action configuration path is empty")]
    EmptyConfigPath,

    #[error("Watch interval must be between 100ms and 1 hour")]
    InvalidWatchInterval,

    #[error("Streaming endpoint must be an http(s) URL")]
    InvalidStreamingEndpoint,

    #[error("Streaming endpoint must use HTTPS in production")]
    StreamingEndpointMustBeHttps,

    #[error("Retry attempts exceed maximum allowed (10)")]
    TooManyRetries,

    #[error("History limit must be between 1 and 500")]
    InvalidHistoryLimit,
}
