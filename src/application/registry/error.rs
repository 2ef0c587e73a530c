//! Registry build and invocation errors.

use thiserror::Error;

use crate::domain::actions::ParameterViolation;
use crate::domain::resilience::{classify, ClassifiedError, ErrorCode, OperationError};

/// Errors that prevent a registry from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Action '{action}' references unknown handler '{handler}'")]
    HandlerNotFound { action: String, handler: String },

    #[error("Action '{action}' is external but no external action client is configured")]
    ExternalClientMissing { action: String },

    #[error("Composed actions form a cycle: {}", .cycle.join(" -> "))]
    ComposedCycle { cycle: Vec<String> },

    #[error("Composed action '{action}' uses step '{step}' which is not available in this mode")]
    ComposedStepUnavailable { action: String, step: String },

    #[error("Action '{action}' depends on '{dependency}' which is not available in this mode")]
    DependencyUnavailable { action: String, dependency: String },

    #[error("Invalid mode override on '{action}' ({field}): {message}")]
    InvalidOverride {
        action: String,
        field: String,
        message: String,
    },

    #[error("Action '{action}' has invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        action: String,
        pattern: String,
        message: String,
    },
}

/// Errors returned by [`ActionRegistry::invoke`](super::ActionRegistry::invoke).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Action '{action}' requires an authenticated customer")]
    Unauthorized { action: String },

    #[error("Action '{action}' requires permission '{permission}'")]
    Forbidden { action: String, permission: String },

    #[error("Action '{action}' is rate limited, retry after {retry_after_ms}ms")]
    RateLimited { action: String, retry_after_ms: u64 },

    #[error("Parameter validation failed for '{action}': {}", join(.violations))]
    Validation {
        action: String,
        violations: Vec<ParameterViolation>,
    },

    #[error("Action '{action}' failed: {source}")]
    Failed {
        action: String,
        source: OperationError,
    },

    #[error("Composed action '{action}' failed at step '{step}': {source}")]
    StepFailed {
        action: String,
        step: String,
        source: Box<InvokeError>,
    },
}

impl InvokeError {
    /// Maps the error onto the user-facing taxonomy.
    pub fn classify(&self) -> ClassifiedError {
        match self {
            InvokeError::UnknownAction(_) => ClassifiedError::new(ErrorCode::NotFound, self.to_string()),
            InvokeError::Unauthorized { .. } => ClassifiedError::new(ErrorCode::AuthError, self.to_string()),
            InvokeError::Forbidden { .. } => {
                ClassifiedError::new(ErrorCode::PermissionError, self.to_string())
            }
            InvokeError::RateLimited { .. } => ClassifiedError::new(ErrorCode::RateLimit, self.to_string()),
            InvokeError::Validation { .. } => {
                ClassifiedError::new(ErrorCode::ValidationError, self.to_string())
            }
            InvokeError::Failed { source, .. } => {
                let mut classified = classify(source);
                classified.technical_message = self.to_string();
                classified
            }
            InvokeError::StepFailed { source, .. } => {
                let mut classified = source.classify();
                classified.technical_message = self.to_string();
                classified
            }
        }
    }

    /// Id of the action the error is about.
    pub fn action(&self) -> &str {
        match self {
            InvokeError::UnknownAction(action)
            | InvokeError::Unauthorized { action }
            | InvokeError::Forbidden { action, .. }
            | InvokeError::RateLimited { action, .. }
            | InvokeError::Validation { action, .. }
            | InvokeError::Failed { action, .. }
            | InvokeError::StepFailed { action, .. } => action,
        }
    }

    /// Violations carried by a validation error, empty otherwise.
    pub fn violations(&self) -> &[ParameterViolation] {
        match self {
            InvokeError::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

fn join(violations: &[ParameterViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_variant() {
        let cases = [
            (InvokeError::UnknownAction("x".into()), ErrorCode::NotFound, false),
            (InvokeError::Unauthorized { action: "x".into() }, ErrorCode::AuthError, false),
            (
                InvokeError::RateLimited { action: "x".into(), retry_after_ms: 10 },
                ErrorCode::RateLimit,
                true,
            ),
            (
                InvokeError::Validation { action: "x".into(), violations: vec![] },
                ErrorCode::ValidationError,
                false,
            ),
            (
                InvokeError::Failed { action: "x".into(), source: OperationError::http(503, "down") },
                ErrorCode::ServerError,
                true,
            ),
        ];

        for (err, code, recoverable) in cases {
            let classified = err.classify();
            assert_eq!(classified.code, code, "{}", err);
            assert_eq!(classified.recoverable, recoverable, "{}", err);
        }
    }

    #[test]
    fn step_failure_classifies_as_inner_error() {
        let err = InvokeError::StepFailed {
            action: "reorder".into(),
            step: "placeOrder".into(),
            source: Box::new(InvokeError::Forbidden {
                action: "placeOrder".into(),
                permission: "orders:place".into(),
            }),
        };

        let classified = err.classify();
        assert_eq!(classified.code, ErrorCode::PermissionError);
        assert!(classified.technical_message.contains("step 'placeOrder'"));
        assert_eq!(err.action(), "reorder");
    }

    #[test]
    fn validation_message_lists_violations() {
        let err = InvokeError::Validation {
            action: "search".into(),
            violations: vec![ParameterViolation::new("query", "is required")],
        };
        assert_eq!(
            err.to_string(),
            "Parameter validation failed for 'search': query is required"
        );
    }
}
