//! The immutable per-turn context handed to action handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::domain::foundation::ValidationError;

/// One cart line as seen by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemSnapshot {
    pub product_id: String,
    pub quantity: u32,
}

impl CartItemSnapshot {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Result<Self, ValidationError> {
        let product_id = product_id.into();
        if product_id.trim().is_empty() {
            return Err(ValidationError::empty_field("productId"));
        }
        if quantity == 0 {
            return Err(ValidationError::invalid_format("quantity", "must be positive"));
        }
        Ok(Self { product_id, quantity })
    }
}

/// The authenticated customer behind a turn, if any.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerIdentity {
    pub customer_id: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Bearer token forwarded to external actions. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl CustomerIdentity {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Default::default()
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl fmt::Debug for CustomerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomerIdentity")
            .field("customer_id", &self.customer_id)
            .field("permissions", &self.permissions)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Snapshot of cart, page and conversation state for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    /// Storefront session the cart belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cart_items: Vec<CartItemSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default)]
    pub message_history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerIdentity>,
}

impl AssistantContext {
    /// Key used to address the cart in the commerce backend.
    pub fn cart_key(&self) -> &str {
        self.session_id
            .as_deref()
            .or_else(|| self.customer.as_ref().map(|c| c.customer_id.as_str()))
            .unwrap_or("guest")
    }

    pub fn with_customer(mut self, customer: CustomerIdentity) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Total number of units across all cart lines.
    pub fn cart_quantity(&self) -> u32 {
        self.cart_items.iter().map(|i| i.quantity).sum()
    }

    /// Returns a new snapshot with `delta` applied; `self` is untouched.
    pub fn apply(&self, delta: &ContextDelta) -> AssistantContext {
        let mut next = self.clone();
        if let Some(items) = &delta.cart_items {
            next.cart_items = items.clone();
        }
        if let Some(page) = &delta.current_page {
            next.current_page = Some(page.clone());
        }
        if let Some(action) = &delta.last_action {
            next.last_action = Some(action.clone());
        }
        next
    }
}

/// Changes a handler made to the commerce state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_items: Option<Vec<CartItemSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
}

impl ContextDelta {
    pub fn is_empty(&self) -> bool {
        self.cart_items.is_none() && self.current_page.is_none() && self.last_action.is_none()
    }

    pub fn with_last_action(mut self, action: impl Into<String>) -> Self {
        self.last_action = Some(action.into());
        self
    }

    pub fn with_cart_items(mut self, items: Vec<CartItemSnapshot>) -> Self {
        self.cart_items = Some(items);
        self
    }

    /// Combines two deltas; fields set in `later` win.
    pub fn merge(mut self, later: ContextDelta) -> ContextDelta {
        if later.cart_items.is_some() {
            self.cart_items = later.cart_items;
        }
        if later.current_page.is_some() {
            self.current_page = later.current_page;
        }
        if later.last_action.is_some() {
            self.last_action = later.last_action;
        }
        self
    }
}
