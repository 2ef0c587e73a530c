//! The request that opens a conversational turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::actions::Mode;
use crate::domain::context::{ChatMessage, ContextDelta, CustomerIdentity};
use crate::domain::foundation::ValidationError;

/// One turn: the action chosen by the orchestration caller plus its inputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Action to invoke.
    pub action: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    /// Last action reported by the previous turn's `actions` event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerIdentity>,
    /// Overrides the configured mode for this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.action.trim().is_empty() {
            return Err(ValidationError::empty_field("action"));
        }
        Ok(())
    }

    /// Carries a previous turn's context changes into this request.
    pub fn with_context(mut self, delta: &ContextDelta) -> Self {
        if delta.current_page.is_some() {
            self.current_page = delta.current_page.clone();
        }
        if delta.last_action.is_some() {
            self.last_action = delta.last_action.clone();
        }
        self
    }

    /// Copy of this request flagged for streaming, as sent over the wire.
    pub fn streaming(&self) -> Self {
        Self {
            stream: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_parses() {
        let req: ChatRequest = serde_json::from_value(json!({ "action": "search" })).unwrap();
        assert_eq!(req.action, "search");
        assert!(req.params.is_null());
        assert!(!req.stream);
    }

    #[test]
    fn streaming_sets_flag_only() {
        let req = ChatRequest::new("search", json!({ "query": "boots" }));
        let wire = req.streaming();
        assert!(wire.stream);
        assert_eq!(wire.params, req.params);
    }

    #[test]
    fn previous_turn_context_is_carried_over() {
        let delta = ContextDelta::default().with_last_action("addToCart");
        let req = ChatRequest {
            current_page: Some("/cart".into()),
            ..ChatRequest::new("getCart", json!({}))
        }
        .with_context(&delta);

        assert_eq!(req.last_action.as_deref(), Some("addToCart"));
        assert_eq!(req.current_page.as_deref(), Some("/cart"));

        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["lastAction"], "addToCart");
    }

    #[test]
    fn blank_action_is_invalid() {
        assert!(ChatRequest::new(" ", Value::Null).validate().is_err());
    }
}
