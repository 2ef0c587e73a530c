//! Stream Transport Port - opens the byte stream behind a streaming turn.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

use crate::domain::resilience::OperationError;
use crate::domain::streaming::ChatRequest;

/// Raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Stream read failed: {0}")]
    Read(String),
}

impl From<TransportError> for OperationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect(msg) | TransportError::Read(msg) => OperationError::network(msg),
            TransportError::Status { status, body } => OperationError::http(status, body),
            TransportError::Timeout { timeout_ms } => OperationError::timeout(timeout_ms),
        }
    }
}

/// Port for opening a streaming response.
///
/// Implementations send the request with `stream: true` and fail with
/// [`TransportError::Status`] before returning any bytes when the response
/// status is not a success.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}
