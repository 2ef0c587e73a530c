//! Streaming client configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for consuming a remote chat stream
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Remote chat endpoint, e.g. `https://assistant.example.com/api/chat`
    pub endpoint: Option<String>,

    /// Reconnects after a failed connection attempt
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base reconnect delay in milliseconds (multiplied by the attempt number)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Whole-response deadline in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl StreamingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate streaming settings
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.retry_attempts > 10 {
            return Err(ValidationError::TooManyRetries);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint).map_err(|_| ValidationError::InvalidStreamingEndpoint)?;
            match url.scheme() {
                "https" => {}
                "http" if production => return Err(ValidationError::StreamingEndpointMustBeHttps),
                "http" => {}
                _ => return Err(ValidationError::InvalidStreamingEndpoint),
            }
        }
        Ok(())
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    120
}
