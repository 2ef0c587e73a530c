//! Data transfer objects for assistant HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::actions::Mode;
use crate::domain::context::AssistantPreferences;
use crate::domain::streaming::StreamEvent;

// ═══════════════════════════════════════════════════════════════════════════
// Request DTOs
// ═══════════════════════════════════════════════════════════════════════════

/// Query parameters for listing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsQuery {
    /// Output format: "openai", "anthropic" or "native"
    #[serde(default = "default_format")]
    pub format: String,
    /// Mode to list; the preferred mode when absent
    #[serde(default)]
    pub mode: Option<Mode>,
}

fn default_format() -> String {
    "native".to_string()
}

// ═══════════════════════════════════════════════════════════════════════════
// Response DTOs
// ═══════════════════════════════════════════════════════════════════════════

/// Response for tool listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResponse {
    pub mode: Mode,
    pub version: String,
    pub format: String,
    pub count: usize,
    pub tools: Vec<Value>,
}

/// Non-streaming chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub events: Vec<StreamEvent>,
}

/// Preferences as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub preferences: AssistantPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub modes: Vec<Mode>,
}

/// Error body for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}
