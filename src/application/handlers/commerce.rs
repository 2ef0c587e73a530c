//! Built-in commerce handlers - the `function` actions backed by a [`CommerceBackend`].
//!
//! Each handler decodes its already-validated parameters into a typed struct,
//! calls the backend, and reports cart changes as a [`ContextDelta`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::context::{AssistantContext, ContextDelta};
use crate::domain::resilience::OperationError;
use crate::ports::{ActionHandler, ActionOutput, Cart, CommerceBackend, HandlerMap, OrderRequest, ProductQuery};

/// Result count used when `searchProducts` is called without a limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Registers every built-in handler under its configuration name.
pub fn commerce_handlers(backend: Arc<dyn CommerceBackend>) -> HandlerMap {
    HandlerMap::new()
        .with("searchProducts", Arc::new(SearchProductsHandler::new(backend.clone())))
        .with("getCart", Arc::new(GetCartHandler::new(backend.clone())))
        .with("addToCart", Arc::new(AddToCartHandler::new(backend.clone())))
        .with("updateCartItem", Arc::new(UpdateCartItemHandler::new(backend.clone())))
        .with("removeFromCart", Arc::new(RemoveFromCartHandler::new(backend.clone())))
        .with("placeOrder", Arc::new(PlaceOrderHandler::new(backend.clone())))
        .with("getCustomer", Arc::new(GetCustomerHandler::new(backend)))
}

fn decode<T: DeserializeOwned>(params: Value) -> Result<T, OperationError> {
    serde_json::from_value(params).map_err(|e| OperationError::validation(e.to_string()))
}

fn cart_output(cart: Cart, action: &str) -> Result<ActionOutput, OperationError> {
    let delta = ContextDelta::default()
        .with_cart_items(cart.snapshot())
        .with_last_action(action);
    let total = cart.total();
    let mut data = serde_json::to_value(&cart).map_err(|e| OperationError::other(e.to_string()))?;
    if let Value::Object(map) = &mut data {
        map.insert("total".to_string(), json!(total));
    }
    Ok(ActionOutput::new(data).with_delta(delta))
}

// ════════════════════════════════════════════════════════════════════════════════
// Search
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    query: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

pub struct SearchProductsHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl SearchProductsHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for SearchProductsHandler {
    async fn handle(&self, params: Value, _: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let params: SearchParams = decode(params)?;
        let query = ProductQuery {
            query: params.query,
            category: params.category,
            limit: params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        };

        let products = self.backend.search_products(&query).await?;
        let delta = ContextDelta::default().with_last_action("searchProducts");
        Ok(ActionOutput::new(json!({
            "query": query.query,
            "count": products.len(),
            "products": products,
        }))
        .with_delta(delta))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Cart
// ════════════════════════════════════════════════════════════════════════════════

pub struct GetCartHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl GetCartHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for GetCartHandler {
    async fn handle(&self, _: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let cart = self.backend.get_cart(context.cart_key()).await?;
        cart_output(cart, "getCart")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartParams {
    product_id: String,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

pub struct AddToCartHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl AddToCartHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for AddToCartHandler {
    async fn handle(&self, params: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let params: AddToCartParams = decode(params)?;
        if params.quantity == 0 {
            return Err(OperationError::validation("quantity must be at least 1"));
        }

        let cart = self
            .backend
            .add_line(context.cart_key(), &params.product_id, params.quantity)
            .await?;
        tracing::debug!(cart = %context.cart_key(), product = %params.product_id, "Added cart line");
        cart_output(cart, "addToCart")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCartItemParams {
    line_id: String,
    quantity: u32,
}

pub struct UpdateCartItemHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl UpdateCartItemHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for UpdateCartItemHandler {
    async fn handle(&self, params: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let params: UpdateCartItemParams = decode(params)?;

        // Zero quantity is a removal
        let cart = if params.quantity == 0 {
            self.backend.remove_line(context.cart_key(), &params.line_id).await?
        } else {
            self.backend
                .update_line(context.cart_key(), &params.line_id, params.quantity)
                .await?
        };
        cart_output(cart, "updateCartItem")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveFromCartParams {
    line_id: String,
}

pub struct RemoveFromCartHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl RemoveFromCartHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for RemoveFromCartHandler {
    async fn handle(&self, params: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let params: RemoveFromCartParams = decode(params)?;
        let cart = self.backend.remove_line(context.cart_key(), &params.line_id).await?;
        cart_output(cart, "removeFromCart")
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout and customer
// ════════════════════════════════════════════════════════════════════════════════

pub struct PlaceOrderHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl PlaceOrderHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for PlaceOrderHandler {
    async fn handle(&self, params: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let request: OrderRequest = decode(params)?;
        let order = self.backend.place_order(context.cart_key(), &request).await?;

        tracing::info!(
            order_id = %order.id,
            total = order.total,
            cost_center = request.cost_center_id.as_deref().unwrap_or("-"),
            "Order placed"
        );

        let delta = ContextDelta::default()
            .with_cart_items(Vec::new())
            .with_last_action("placeOrder");
        let data = serde_json::to_value(&order).map_err(|e| OperationError::other(e.to_string()))?;
        Ok(ActionOutput::new(data).with_delta(delta))
    }
}

/// Permission allowing a caller to read profiles other than their own.
pub const CUSTOMER_READ_PERMISSION: &str = "customers:read";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetCustomerParams {
    #[serde(default)]
    customer_id: Option<String>,
}

pub struct GetCustomerHandler {
    backend: Arc<dyn CommerceBackend>,
}

impl GetCustomerHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ActionHandler for GetCustomerHandler {
    async fn handle(&self, params: Value, context: &AssistantContext) -> Result<ActionOutput, OperationError> {
        let params: GetCustomerParams = decode(params)?;
        let caller = context
            .customer
            .as_ref()
            .ok_or_else(|| OperationError::http(401, "no customer in context"))?;

        // Other customers' profiles need an explicit grant
        let customer_id = match params.customer_id {
            Some(requested) if requested != caller.customer_id => {
                if !caller.has_permission(CUSTOMER_READ_PERMISSION) {
                    return Err(OperationError::http(
                        403,
                        format!("missing permission '{}'", CUSTOMER_READ_PERMISSION),
                    ));
                }
                requested
            }
            _ => caller.customer_id.clone(),
        };

        let customer = self.backend.get_customer(&customer_id).await?;
        let data = serde_json::to_value(&customer).map_err(|e| OperationError::other(e.to_string()))?;
        Ok(ActionOutput::new(data).with_delta(ContextDelta::default().with_last_action("getCustomer")))
    }
}
