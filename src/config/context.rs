//! Conversation context configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::context::DEFAULT_HISTORY_LIMIT;

/// Settings for per-turn context assembly
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Messages kept when no saved preferences exist
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// YAML file holding assistant preferences
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
}

impl ContextConfig {
    /// Validate context settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_limit == 0 || self.history_limit > 500 {
            return Err(ValidationError::InvalidHistoryLimit);
        }
        if self.preferences_path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CONTEXT__PREFERENCES_PATH"));
        }
        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            preferences_path: default_preferences_path(),
        }
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_preferences_path() -> String {
    "data/preferences.yaml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.history_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_history_limit_bounds() {
        for limit in [0, 501] {
            let config = ContextConfig {
                history_limit: limit,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ValidationError::InvalidHistoryLimit)));
        }
    }
}
