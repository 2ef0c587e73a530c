//! Stream event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::context::ContextDelta;
use crate::domain::resilience::{ClassifiedError, ErrorCode};

/// A single typed event, serialized as `{"type": ..., "data": ...}`.
///
/// Every payload field has a default, so `{"type":"content","data":{}}` is a
/// valid (empty) content event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Metadata(MetadataPayload),
    Content(ContentPayload),
    Actions(ActionsPayload),
    Ui(UiPayload),
    Error(ErrorPayload),
    Done(DonePayload),
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content(ContentPayload { text: text.into() })
    }

    pub fn done() -> Self {
        StreamEvent::Done(DonePayload::default())
    }

    /// Error event exposing only the sanitized user message.
    pub fn error(classified: &ClassifiedError) -> Self {
        StreamEvent::Error(ErrorPayload {
            message: classified.user_message.clone(),
            code: Some(classified.code),
            recoverable: classified.recoverable,
        })
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Metadata(_) => "metadata",
            StreamEvent::Content(_) => "content",
            StreamEvent::Actions(_) => "actions",
            StreamEvent::Ui(_) => "ui",
            StreamEvent::Error(_) => "error",
            StreamEvent::Done(_) => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPayload {
    pub text: String,
}

/// Invoked actions plus the context changes the client carries into its next turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsPayload {
    pub actions: Vec<ActionStatus>,
    #[serde(skip_serializing_if = "ContextDelta::is_empty")]
    pub context: ContextDelta,
}

/// Outcome of one invoked action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatus {
    pub id: String,
    pub status: InvocationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub recoverable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DonePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
