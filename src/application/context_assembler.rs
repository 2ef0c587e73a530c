//! Builds the per-turn [`AssistantContext`].

use std::sync::Arc;

use crate::domain::context::{AssistantContext, AssistantPreferences, ChatMessage};
use crate::domain::streaming::ChatRequest;
use crate::ports::CommerceBackend;

/// Snapshots cart and conversation state for one turn.
pub struct ContextAssembler {
    backend: Arc<dyn CommerceBackend>,
}

impl ContextAssembler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }

    /// Assembles the context for `request`.
    ///
    /// A failed cart fetch degrades to an empty cart rather than failing the turn.
    pub async fn assemble(
        &self,
        request: &ChatRequest,
        preferences: &AssistantPreferences,
    ) -> AssistantContext {
        let mut context = AssistantContext {
            session_id: request.session_id.clone(),
            current_page: request.current_page.clone(),
            last_action: request.last_action.clone(),
            customer: request.customer.clone(),
            message_history: trim_history(&request.history, preferences.history_limit),
            ..Default::default()
        };

        match self.backend.get_cart(context.cart_key()).await {
            Ok(cart) => context.cart_items = cart.snapshot(),
            Err(e) => {
                tracing::warn!(
                    cart = %context.cart_key(),
                    error = %e,
                    "Cart fetch failed, continuing with empty cart"
                );
            }
        }

        context
    }
}

/// Keeps the most recent `limit` messages, oldest first.
pub fn trim_history(messages: &[ChatMessage], limit: usize) -> Vec<ChatMessage> {
    let skip = messages.len().saturating_sub(limit);
    messages[skip..].to_vec()
}
