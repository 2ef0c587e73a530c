//! Errors raised while loading action configuration and validating inputs.

use std::fmt;

use thiserror::Error;

/// A single structural problem found in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the offending field, e.g. `actions[1].parameters.query.type`.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors that block a configuration file from producing a registry.
#[derive(Debug, Error)]
pub enum ActionConfigError {
    #[error("Failed to read configuration file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration has {} structural violation(s): {}", .0.len(), join_violations(.0))]
    Structural(Vec<SchemaViolation>),

    #[error("Duplicate action id '{0}'")]
    DuplicateId(String),

    #[error("Action '{action}' depends on unknown action '{missing}'")]
    DanglingDependency { action: String, missing: String },
}

impl ActionConfigError {
    /// Violations carried by a structural error, empty for other kinds.
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            ActionConfigError::Structural(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A parameter that failed validation at invocation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterViolation {
    /// Dotted path inside the parameters, e.g. `items[0].quantity`.
    pub path: String,
    pub message: String,
}

impl ParameterViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParameterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_error_lists_all_violations() {
        let err = ActionConfigError::Structural(vec![
            SchemaViolation::new("actions[0].id", "must be a non-empty string"),
            SchemaViolation::new("actions[1].category", "unknown category 'toys'"),
        ]);
        let message = err.to_string();
        assert!(message.contains("2 structural violation(s)"));
        assert!(message.contains("actions[0].id: must be a non-empty string"));
        assert!(message.contains("actions[1].category"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn dangling_dependency_names_both_ids() {
        let err = ActionConfigError::DanglingDependency {
            action: "checkout".to_string(),
            missing: "getCart".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'checkout' depends on unknown action 'getCart'"
        );
    }
}
