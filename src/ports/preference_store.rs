//! Preference Store Port - persistence for assistant preferences.

use async_trait::async_trait;

use crate::domain::context::AssistantPreferences;
use crate::domain::foundation::ValidationError;

/// Errors that can occur while loading or saving preferences.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to serialize preferences: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize preferences: {0}")]
    DeserializationFailed(String),

    #[error("Invalid preferences: {0}")]
    Invalid(#[from] ValidationError),
}

/// Port for loading and saving [`AssistantPreferences`].
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Loads saved preferences, or the defaults when none were saved yet.
    async fn load(&self) -> Result<AssistantPreferences, PreferenceStoreError>;

    /// Validates and saves preferences.
    async fn save(&self, preferences: &AssistantPreferences) -> Result<(), PreferenceStoreError>;
}
