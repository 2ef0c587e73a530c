//! Raw operation failures produced by handlers and transports.

use thiserror::Error;

/// A raw, unclassified failure.
///
/// Handlers, the external endpoint client and the streaming transport all
/// report failures with this type. The retry loop propagates it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Connection-level or fetch-layer failure.
    #[error("network error: {0}")]
    Network(String),

    /// The operation was aborted before completing.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation exceeded its deadline and was aborted.
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured deadline.
        timeout_ms: u64,
    },

    /// A response carried a non-success HTTP status.
    #[error("http status {status}: {message}")]
    Http {
        /// Status code returned by the remote side.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Input rejected by the backend or handler.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl OperationError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an uncategorised error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns the HTTP status when this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
