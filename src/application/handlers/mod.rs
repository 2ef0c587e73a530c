//! Application handlers.
//!
//! - `commerce` - built-in `function` actions over the commerce backend
//! - `stream_action` - runs a chat turn and produces its stream events

mod commerce;
mod stream_action;

pub use commerce::{
    commerce_handlers, AddToCartHandler, GetCartHandler, GetCustomerHandler, PlaceOrderHandler,
    RemoveFromCartHandler, SearchProductsHandler, UpdateCartItemHandler, CUSTOMER_READ_PERMISSION,
    DEFAULT_SEARCH_LIMIT,
};
pub use stream_action::StreamActionHandler;
