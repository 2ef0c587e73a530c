//! Configuration file model and the load-time validation pipeline.
//!
//! [`ConfigurationFile::from_value`] runs the four validation steps in order:
//! structural checks (all violations collected), id uniqueness, dependency
//! resolution, then a single idempotent default pass.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ActionConfigError, SchemaViolation};
use super::structure;
use super::{
    ActionDefinition, Implementation, ObservabilityPolicy, PerformancePolicy, ResponsePolicy, SecurityPolicy,
};

/// Deployment environment declared by a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

pub const CONFIG_ENVIRONMENTS: &[&str] = &["development", "staging", "production"];

/// Settings layered under every action's own policies (action-level wins).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Globals {
    #[serde(default)]
    pub performance: PerformancePolicy,
    #[serde(default)]
    pub security: SecurityPolicy,
    #[serde(default)]
    pub observability: ObservabilityPolicy,
    #[serde(default)]
    pub response: ResponsePolicy,
}

/// A validated, defaulted set of action definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationFile {
    pub version: String,
    #[serde(default)]
    pub environment: ConfigEnvironment,
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub globals: Globals,
}

impl ConfigurationFile {
    /// Parses and validates a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, ActionConfigError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ActionConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parses and validates a YAML document (JSON is valid YAML too).
    pub fn from_yaml_str(input: &str) -> Result<Self, ActionConfigError> {
        let value: Value =
            serde_yaml::from_str(input).map_err(|e| ActionConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Runs the full validation pipeline over an untyped document.
    pub fn from_value(value: Value) -> Result<Self, ActionConfigError> {
        let violations = structure::check_document(&value);
        if !violations.is_empty() {
            return Err(ActionConfigError::Structural(violations));
        }

        let mut config: ConfigurationFile = serde_json::from_value(value).map_err(|e| {
            ActionConfigError::Structural(vec![SchemaViolation::new("$", e.to_string())])
        })?;

        config.check_unique_ids()?;
        config.check_dependencies()?;
        config.apply_defaults();
        Ok(config)
    }

    /// Rejects the file if two actions share an id.
    pub fn check_unique_ids(&self) -> Result<(), ActionConfigError> {
        let mut seen = HashSet::new();
        for action in &self.actions {
            if !seen.insert(action.id.as_str()) {
                return Err(ActionConfigError::DuplicateId(action.id.clone()));
            }
        }
        Ok(())
    }

    /// Rejects the file if any dependency or composed step names an unknown id.
    pub fn check_dependencies(&self) -> Result<(), ActionConfigError> {
        let ids: HashSet<&str> = self.actions.iter().map(|a| a.id.as_str()).collect();
        for action in &self.actions {
            let steps: &[String] = match &action.implementation {
                Implementation::Composed { steps } => steps.as_slice(),
                _ => &[],
            };
            for dependency in action.dependencies.iter().chain(steps) {
                if !ids.contains(dependency.as_str()) {
                    return Err(ActionConfigError::DanglingDependency {
                        action: action.id.clone(),
                        missing: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies globals and built-in defaults to every action. Idempotent.
    pub fn apply_defaults(&mut self) {
        for action in &mut self.actions {
            apply_defaults(action, &self.globals);
        }
    }

    /// Looks up an action by id.
    pub fn action(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.id == id)
    }
}

/// Fills every unset policy field from `globals`, then from built-in defaults.
///
/// Only `None` fields are written, so applying this twice is a no-op.
pub fn apply_defaults(action: &mut ActionDefinition, globals: &Globals) {
    action.performance.fill_from(&globals.performance);
    action.performance.fill_from(&PerformancePolicy::builtin());

    action.security.fill_from(&globals.security);
    action.security.fill_from(&SecurityPolicy::builtin());

    action.observability.fill_from(&globals.observability);
    action.observability.fill_from(&ObservabilityPolicy::builtin());

    action.response.fill_from(&globals.response);
    action.response.fill_from(&ResponsePolicy::builtin());
}
