//! File-based Preference Store Adapter
//!
//! Stores assistant preferences as a single YAML file on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::context::AssistantPreferences;
use crate::ports::{PreferenceStore, PreferenceStoreError};

/// YAML file holding [`AssistantPreferences`].
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Create a store backed by `path`
    ///
    /// The file and its parent directory are created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn load(&self) -> Result<AssistantPreferences, PreferenceStoreError> {
        if !self.path.exists() {
            return Ok(AssistantPreferences::default());
        }

        let yaml = fs::read_to_string(&self.path)
            .await
            .map_err(|e| PreferenceStoreError::Io(e.to_string()))?;

        let preferences: AssistantPreferences = serde_yaml::from_str(&yaml)
            .map_err(|e| PreferenceStoreError::DeserializationFailed(e.to_string()))?;

        preferences.validate()?;
        Ok(preferences)
    }

    async fn save(&self, preferences: &AssistantPreferences) -> Result<(), PreferenceStoreError> {
        preferences.validate()?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| PreferenceStoreError::Io(e.to_string()))?;
        }

        let yaml = serde_yaml::to_string(preferences)
            .map_err(|e| PreferenceStoreError::SerializationFailed(e.to_string()))?;

        fs::write(&self.path, yaml)
            .await
            .map_err(|e| PreferenceStoreError::Io(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), "Saved assistant preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actions::Mode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("prefs.yaml"));

        assert_eq!(store.load().await.unwrap(), AssistantPreferences::default());
    }

    #[tokio::test]
    async fn saved_preferences_load_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("nested/prefs.yaml"));
        let prefs = AssistantPreferences {
            mode: Mode::B2b,
            history_limit: 5,
            streaming: false,
        };

        store.save(&prefs).await.unwrap();

        assert_eq!(store.load().await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn invalid_preferences_are_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("prefs.yaml"));
        let prefs = AssistantPreferences {
            history_limit: 0,
            ..Default::default()
        };

        let result = store.save(&prefs).await;

        assert!(matches!(result, Err(PreferenceStoreError::Invalid(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs.yaml");
        std::fs::write(&path, "mode: b2b\n").unwrap();

        let prefs = FilePreferenceStore::new(&path).load().await.unwrap();

        assert_eq!(prefs.mode, Mode::B2b);
        assert_eq!(prefs.history_limit, 20);
        assert!(prefs.streaming);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_deserialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs.yaml");
        std::fs::write(&path, "mode: [not, a, mode]\n").unwrap();

        let result = FilePreferenceStore::new(&path).load().await;

        assert!(matches!(result, Err(PreferenceStoreError::DeserializationFailed(_))));
    }
}
