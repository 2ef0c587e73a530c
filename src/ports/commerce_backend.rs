//! Commerce Backend Port - the storefront operations actions run against.
//!
//! The backend's data model and consistency guarantees are its own; this port
//! only fixes the shapes the built-in handlers exchange with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::context::CartItemSnapshot;
use crate::domain::foundation::Timestamp;
use crate::domain::resilience::OperationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub price: f64,
    pub currency: String,
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub lines: Vec<CartLine>,
    pub currency: String,
}

impl Cart {
    pub fn total(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.unit_price * f64::from(l.quantity))
            .sum()
    }

    /// The assistant's view of the cart.
    pub fn snapshot(&self) -> Vec<CartItemSnapshot> {
        self.lines
            .iter()
            .map(|l| CartItemSnapshot {
                product_id: l.product_id.clone(),
                quantity: l.quantity,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: String,
    pub total: f64,
    pub currency: String,
    pub placed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Errors reported by a commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Customer is not authenticated")]
    Unauthorized,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Commerce backend unavailable: {0}")]
    Unavailable(String),
}

impl From<CommerceError> for OperationError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::NotFound(what) => OperationError::http(404, what),
            CommerceError::Unauthorized => OperationError::http(401, "customer is not authenticated"),
            CommerceError::Rejected(reason) => OperationError::validation(reason),
            CommerceError::Unavailable(reason) => OperationError::network(reason),
        }
    }
}

/// Port for storefront operations.
///
/// Carts are addressed by an opaque key (see `AssistantContext::cart_key`).
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    async fn get_cart(&self, cart_key: &str) -> Result<Cart, CommerceError>;

    async fn add_line(
        &self,
        cart_key: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<Cart, CommerceError>;

    async fn update_line(
        &self,
        cart_key: &str,
        line_id: &str,
        quantity: u32,
    ) -> Result<Cart, CommerceError>;

    async fn remove_line(&self, cart_key: &str, line_id: &str) -> Result<Cart, CommerceError>;

    async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CommerceError>;

    async fn place_order(
        &self,
        cart_key: &str,
        request: &OrderRequest,
    ) -> Result<Order, CommerceError>;

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, CommerceError>;
}
