//! Error classification - maps raw failures onto the user-facing taxonomy.
//!
//! Rules are checked in order:
//!
//! | Raw failure                         | Code               | Recoverable |
//! |-------------------------------------|--------------------|-------------|
//! | network / fetch layer               | `NETWORK_ERROR`    | yes         |
//! | cancellation or timeout             | `TIMEOUT_ERROR`    | yes         |
//! | HTTP 401                            | `AUTH_ERROR`       | no          |
//! | HTTP 403                            | `PERMISSION_ERROR` | no          |
//! | HTTP 404                            | `NOT_FOUND`        | no          |
//! | HTTP 429                            | `RATE_LIMIT`       | yes         |
//! | HTTP 5xx                            | `SERVER_ERROR`     | yes         |
//! | validation variant or marker text   | `VALIDATION_ERROR` | no          |
//! | anything else                       | `UNKNOWN_ERROR`    | yes         |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::OperationError;

/// Substring (case-insensitive) that marks a message as a validation failure.
pub const VALIDATION_MARKER: &str = "validation";

/// Failure taxonomy shared by the registry, retry loop and stream protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NetworkError,
    TimeoutError,
    AuthError,
    PermissionError,
    NotFound,
    RateLimit,
    ServerError,
    ValidationError,
    UnknownError,
}

impl ErrorCode {
    /// Default recoverability for this code.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::TimeoutError
                | ErrorCode::RateLimit
                | ErrorCode::ServerError
                | ErrorCode::UnknownError
        )
    }

    /// Sanitized message safe to show to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::NetworkError => {
                "We couldn't reach the store right now. Please check your connection and try again."
            }
            ErrorCode::TimeoutError => "That took longer than expected. Please try again.",
            ErrorCode::AuthError => "Please sign in to continue.",
            ErrorCode::PermissionError => "Your account doesn't have permission to do that.",
            ErrorCode::NotFound => "We couldn't find what you were looking for.",
            ErrorCode::RateLimit => {
                "You're sending requests too quickly. Please wait a moment and try again."
            }
            ErrorCode::ServerError => "The store is having trouble right now. Please try again shortly.",
            ErrorCode::ValidationError => "Some of the details provided aren't valid. Please check and try again.",
            ErrorCode::UnknownError => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::PermissionError => "PERMISSION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// A raw failure translated into the taxonomy.
///
/// `technical_message` is for logs only and must never reach an end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub user_message: String,
    pub technical_message: String,
    pub code: ErrorCode,
    pub recoverable: bool,
}

impl ClassifiedError {
    /// Creates a classified error using the code's default message and recoverability.
    pub fn new(code: ErrorCode, technical_message: impl Into<String>) -> Self {
        Self {
            user_message: code.user_message().to_string(),
            technical_message: technical_message.into(),
            code,
            recoverable: code.is_recoverable(),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.technical_message)
    }
}

/// Classifies a raw failure.
pub fn classify(error: &OperationError) -> ClassifiedError {
    ClassifiedError::new(code_for(error), error.to_string())
}

fn code_for(error: &OperationError) -> ErrorCode {
    match error {
        OperationError::Network(_) => ErrorCode::NetworkError,
        OperationError::Cancelled | OperationError::Timeout { .. } => ErrorCode::TimeoutError,
        OperationError::Http { status, message } => match status {
            401 => ErrorCode::AuthError,
            403 => ErrorCode::PermissionError,
            404 => ErrorCode::NotFound,
            429 => ErrorCode::RateLimit,
            500..=599 => ErrorCode::ServerError,
            _ => code_for_message(message),
        },
        OperationError::Validation(_) => ErrorCode::ValidationError,
        OperationError::Other(message) => code_for_message(message),
    }
}

fn code_for_message(message: &str) -> ErrorCode {
    if message.to_lowercase().contains(VALIDATION_MARKER) {
        ErrorCode::ValidationError
    } else {
        ErrorCode::UnknownError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failure_is_recoverable() {
        let classified = classify(&OperationError::network("connection refused"));
        assert_eq!(classified.code, ErrorCode::NetworkError);
        assert!(classified.recoverable);
    }

    #[test]
    fn cancellation_and_timeout_map_to_timeout_error() {
        assert_eq!(classify(&OperationError::Cancelled).code, ErrorCode::TimeoutError);
        let timeout = classify(&OperationError::timeout(500));
        assert_eq!(timeout.code, ErrorCode::TimeoutError);
        assert!(timeout.recoverable);
    }

    #[test]
    fn rate_limit_is_recoverable() {
        let classified = classify(&OperationError::http(429, "Too Many Requests"));
        assert_eq!(classified.code, ErrorCode::RateLimit);
        assert!(classified.recoverable);
    }

    #[test]
    fn unauthorized_is_not_recoverable() {
        let classified = classify(&OperationError::http(401, "Unauthorized"));
        assert_eq!(classified.code, ErrorCode::AuthError);
        assert!(!classified.recoverable);
    }

    #[test]
    fn forbidden_and_not_found_are_not_recoverable() {
        let forbidden = classify(&OperationError::http(403, "Forbidden"));
        assert_eq!(forbidden.code, ErrorCode::PermissionError);
        assert!(!forbidden.recoverable);

        let missing = classify(&OperationError::http(404, "Not Found"));
        assert_eq!(missing.code, ErrorCode::NotFound);
        assert!(!missing.recoverable);
    }

    #[test]
    fn server_errors_cover_5xx_range() {
        for status in [500, 502, 503, 599] {
            let classified = classify(&OperationError::http(status, "boom"));
            assert_eq!(classified.code, ErrorCode::ServerError, "status {}", status);
            assert!(classified.recoverable);
        }
    }

    #[test]
    fn validation_marker_in_message_is_detected() {
        let classified = classify(&OperationError::other("Validation failed: sku is required"));
        assert_eq!(classified.code, ErrorCode::ValidationError);
        assert!(!classified.recoverable);

        let from_status = classify(&OperationError::http(400, "request VALIDATION error"));
        assert_eq!(from_status.code, ErrorCode::ValidationError);
    }

    #[test]
    fn unmatched_errors_are_unknown_and_recoverable() {
        let classified = classify(&OperationError::http(418, "teapot"));
        assert_eq!(classified.code, ErrorCode::UnknownError);
        assert!(classified.recoverable);
    }

    #[test]
    fn user_message_never_contains_technical_detail() {
        let classified = classify(&OperationError::http(500, "NullPointer at db.rs:42"));
        assert!(!classified.user_message.contains("db.rs"));
        assert!(classified.technical_message.contains("db.rs"));
    }

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::PermissionError).unwrap();
        assert_eq!(json, "\"PERMISSION_ERROR\"");
        assert_eq!(ErrorCode::RateLimit.to_string(), "RATE_LIMIT");
    }
}
