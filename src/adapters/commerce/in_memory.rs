//! In-memory commerce backend for development and tests.
//!
//! Carts are created on first access. Orders are recorded but never
//! fulfilled.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    Cart, CartLine, CommerceBackend, CommerceError, Customer, Order, OrderRequest, Product,
    ProductQuery,
};

const CURRENCY: &str = "USD";

/// Commerce backend backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryCommerceBackend {
    products: RwLock<HashMap<String, Product>>,
    customers: RwLock<HashMap<String, Customer>>,
    carts: RwLock<HashMap<String, Cart>>,
    orders: RwLock<Vec<Order>>,
    next_line: AtomicU64,
}

impl InMemoryCommerceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with a small outdoor-gear catalog and one customer.
    pub fn with_sample_catalog() -> Self {
        let product = |id: &str, name: &str, category: &str, price: f64, in_stock: bool| Product {
            id: id.to_string(),
            name: name.to_string(),
            sku: Some(id.to_uppercase()),
            category: Some(category.to_string()),
            price,
            currency: CURRENCY.to_string(),
            in_stock,
        };

        let products = [
            product("boot-001", "Trail Hiking Boots", "footwear", 129.0, true),
            product("boot-002", "Winter Snow Boots", "footwear", 159.0, true),
            product("jacket-001", "Rain Shell Jacket", "apparel", 89.5, true),
            product("pack-001", "Daypack 24L", "bags", 64.0, false),
            product("sock-001", "Merino Hiking Socks", "apparel", 18.0, true),
        ];
        let customer = Customer {
            id: "cust-001".to_string(),
            email: "buyer@example.com".to_string(),
            name: "Sample Buyer".to_string(),
            company: Some("Example Outfitters".to_string()),
        };

        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            customers: RwLock::new(HashMap::from([(customer.id.clone(), customer)])),
            ..Self::default()
        }
    }

    // === Test Helpers ===

    /// Orders placed so far.
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    fn line_id(&self) -> String {
        format!("line-{}", self.next_line.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn empty_cart(key: &str) -> Cart {
        Cart {
            id: key.to_string(),
            lines: Vec::new(),
            currency: CURRENCY.to_string(),
        }
    }
}

#[async_trait]
impl CommerceBackend for InMemoryCommerceBackend {
    async fn get_cart(&self, cart_key: &str) -> Result<Cart, CommerceError> {
        let carts = self.carts.read().await;
        Ok(carts
            .get(cart_key)
            .cloned()
            .unwrap_or_else(|| Self::empty_cart(cart_key)))
    }

    async fn add_line(
        &self,
        cart_key: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<Cart, CommerceError> {
        let product = self
            .products
            .read()
            .await
            .get(product_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(format!("product {}", product_id)))?;

        if !product.in_stock {
            return Err(CommerceError::Rejected(format!("{} is out of stock", product.name)));
        }

        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(cart_key.to_string())
            .or_insert_with(|| Self::empty_cart(cart_key));

        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(CartLine {
                line_id: self.line_id(),
                product_id: product.id,
                quantity,
                unit_price: product.price,
            }),
        }

        Ok(cart.clone())
    }

    async fn update_line(
        &self,
        cart_key: &str,
        line_id: &str,
        quantity: u32,
    ) -> Result<Cart, CommerceError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(cart_key)
            .ok_or_else(|| CommerceError::NotFound(format!("cart {}", cart_key)))?;

        let line = cart
            .lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| CommerceError::NotFound(format!("cart line {}", line_id)))?;
        line.quantity = quantity;

        Ok(cart.clone())
    }

    async fn remove_line(&self, cart_key: &str, line_id: &str) -> Result<Cart, CommerceError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(cart_key)
            .ok_or_else(|| CommerceError::NotFound(format!("cart {}", cart_key)))?;

        let before = cart.lines.len();
        cart.lines.retain(|l| l.line_id != line_id);
        if cart.lines.len() == before {
            return Err(CommerceError::NotFound(format!("cart line {}", line_id)));
        }

        Ok(cart.clone())
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CommerceError> {
        let needle = query.query.to_lowercase();
        let terms: Vec<&str> = needle.split_whitespace().collect();

        let products = self.products.read().await;
        let mut matches: Vec<Product> = products
            .values()
            .filter(|p| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |c| p.category.as_deref() == Some(c))
            })
            .filter(|p| {
                let haystack = format!(
                    "{} {} {}",
                    p.name.to_lowercase(),
                    p.category.as_deref().unwrap_or(""),
                    p.sku.as_deref().unwrap_or("").to_lowercase()
                );
                terms.iter().all(|t| haystack.contains(t.trim_end_matches('s')))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches.truncate(query.limit);
        Ok(matches)
    }

    async fn place_order(
        &self,
        cart_key: &str,
        request: &OrderRequest,
    ) -> Result<Order, CommerceError> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(cart_key)
            .filter(|c| !c.lines.is_empty())
            .ok_or_else(|| CommerceError::Rejected("cart is empty".to_string()))?;

        let order = Order {
            id: format!("ord-{}", Uuid::new_v4().simple()),
            status: "placed".to_string(),
            total: cart.total(),
            currency: cart.currency.clone(),
            placed_at: Timestamp::now(),
        };
        cart.lines.clear();
        drop(carts);

        tracing::debug!(
            order_id = %order.id,
            po_number = request.po_number.as_deref().unwrap_or("-"),
            "Recorded in-memory order"
        );
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, CommerceError> {
        self.customers
            .read()
            .await
            .get(customer_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(format!("customer {}", customer_id)))
    }
}
