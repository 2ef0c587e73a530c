//! Context module - per-turn snapshots of commerce and conversation state.
//!
//! An [`AssistantContext`] is built once per turn and never mutated. Handlers
//! describe the changes they made as a [`ContextDelta`]; applying it yields the
//! next snapshot.

mod message;
mod preferences;
mod snapshot;

pub use message::{ChatMessage, MessageRole};
pub use preferences::{AssistantPreferences, DEFAULT_HISTORY_LIMIT};
pub use snapshot::{AssistantContext, CartItemSnapshot, ContextDelta, CustomerIdentity};
