//! Configuration file loader.

use std::path::Path;

use tokio::fs;

use crate::domain::actions::{ActionConfigError, ConfigurationFile};

/// Document syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.json` is JSON; everything else is read as YAML, which also accepts JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Reads, validates and defaults the configuration at `path`.
pub async fn load(path: &Path) -> Result<ConfigurationFile, ActionConfigError> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| ActionConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let config = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => ConfigurationFile::from_json_str(&contents)?,
        ConfigFormat::Yaml => ConfigurationFile::from_yaml_str(&contents)?,
    };

    tracing::debug!(
        path = %path.display(),
        version = %config.version,
        actions = config.actions.len(),
        "Loaded action configuration"
    );
    Ok(config)
}
