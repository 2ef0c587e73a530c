//! Conversation messages carried in the rolling history.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub sent_at: Timestamp,
}

impl ChatMessage {
    /// Creates a message, rejecting blank content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        Ok(Self {
            role,
            content,
            sent_at: Timestamp::now(),
        })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(MessageRole::Assistant, content)
    }
}
