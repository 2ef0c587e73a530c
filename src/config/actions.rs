//! Action configuration settings

use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::actions::Mode;

/// Where the action configuration lives and how it is served
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsConfig {
    /// Path to the JSON or YAML action configuration file
    #[serde(default = "default_config_path")]
    pub config_path: String,

    /// Mode used when neither the request nor saved preferences choose one
    #[serde(default)]
    pub mode: Mode,

    /// Reload the file when it changes
    #[serde(default)]
    pub watch: bool,

    /// Poll interval for the watcher in milliseconds
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,

    /// Service key sent to `external` action endpoints
    pub external_api_key: Option<Secret<String>>,
}

impl ActionsConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.config_path)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    /// Validate action settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_path.trim().is_empty() {
            return Err(ValidationError::EmptyConfigPath);
        }
        if self.watch && !(100..=3_600_000).contains(&self.watch_interval_ms) {
            return Err(ValidationError::InvalidWatchInterval);
        }
        Ok(())
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            mode: Mode::default(),
            watch: false,
            watch_interval_ms: default_watch_interval(),
            external_api_key: None,
        }
    }
}

fn default_config_path() -> String {
    "config/actions.yaml".to_string()
}

fn default_watch_interval() -> u64 {
    2000
}
