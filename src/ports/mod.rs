//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Action Execution Ports
//!
//! - `ActionHandler` - Named local handler a function action dispatches to
//! - `ExternalActionClient` - HTTP calls made by external actions
//! - `CommerceBackend` - Catalog, cart, order and customer operations
//!
//! ## Streaming and State Ports
//!
//! - `StreamTransport` - Raw byte stream behind the streaming client
//! - `PreferenceStore` - Persistence for assistant preferences

mod action_handler;
mod commerce_backend;
mod external_action_client;
mod preference_store;
mod stream_transport;

pub use action_handler::{ActionHandler, ActionOutput, FnHandler, HandlerMap};
pub use commerce_backend::{
    Cart, CartLine, CommerceBackend, CommerceError, Customer, Order, OrderRequest, Product,
    ProductQuery,
};
pub use external_action_client::{ExternalActionClient, ExternalRequest};
pub use preference_store::{PreferenceStore, PreferenceStoreError};
pub use stream_transport::{ByteStream, StreamTransport, TransportError};
