//! HTTP Stream Transport - POSTs a chat request and exposes the SSE body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::domain::streaming::ChatRequest;
use crate::ports::{ByteStream, StreamTransport, TransportError};

/// Configuration for [`HttpStreamTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Full URL of the streaming chat endpoint.
    pub endpoint: String,
    /// Optional bearer token sent with every request.
    api_key: Option<Secret<String>>,
    /// Deadline for the whole response, body included.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(api_key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// reqwest-backed [`StreamTransport`].
#[derive(Debug, Clone)]
pub struct HttpStreamTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpStreamTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("Accept", "text/event-stream")
            .json(request);

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                TransportError::Connect(e.to_string())
            }
        })
    }

    /// Fails with the status and body when the response is not a success.
    async fn handle_response_status(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let response = self.send(&request.streaming()).await?;
        let response = Self::handle_response_status(response).await?;

        tracing::debug!(endpoint = %self.config.endpoint, "Stream opened");

        let timeout_ms = self.config.timeout.as_millis() as u64;
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout { timeout_ms }
                } else {
                    TransportError::Read(e.to_string())
                }
            })
        });
        Ok(Box::pin(body))
    }
}
