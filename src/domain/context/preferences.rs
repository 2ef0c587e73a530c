//! Assistant preferences, loaded and saved through the preference store port.

use serde::{Deserialize, Serialize};

use crate::domain::actions::Mode;
use crate::domain::foundation::ValidationError;

/// Number of messages kept in the rolling history when nothing else is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Per-deployment assistant settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantPreferences {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_streaming")]
    pub streaming: bool,
}

impl Default for AssistantPreferences {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            streaming: true,
        }
    }
}

impl AssistantPreferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_limit == 0 {
            return Err(ValidationError::invalid_format(
                "historyLimit",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_streaming() -> bool {
    true
}
