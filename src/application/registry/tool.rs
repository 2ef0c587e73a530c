//! Tool definitions exposed to the orchestration caller.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::actions::{parameters_to_json_schema, ActionCategory, ActionDefinition};

/// An action as offered to an LLM for function calling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub category: ActionCategory,
    /// JSON Schema of the merged parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn from_action(action: &ActionDefinition) -> Self {
        Self {
            name: action.id.clone(),
            description: action.description.clone(),
            category: action.category,
            parameters: parameters_to_json_schema(&action.parameters),
        }
    }

    /// Converts to OpenAI function calling format.
    pub fn to_openai_format(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }

    /// Converts to Anthropic tool format.
    pub fn to_anthropic_format(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.parameters
        })
    }

    pub fn to_format(&self, format: ToolFormat) -> Value {
        match format {
            ToolFormat::OpenAi => self.to_openai_format(),
            ToolFormat::Anthropic => self.to_anthropic_format(),
            ToolFormat::Native => serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}

/// Output shape of a tool listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFormat {
    #[default]
    OpenAi,
    Anthropic,
    Native,
}

impl FromStr for ToolFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ToolFormat::OpenAi),
            "anthropic" => Ok(ToolFormat::Anthropic),
            "native" => Ok(ToolFormat::Native),
            other => Err(format!("unknown tool format '{}'", other)),
        }
    }
}
