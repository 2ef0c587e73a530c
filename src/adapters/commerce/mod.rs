//! Commerce backend adapters.
//!
//! - **InMemoryCommerceBackend** - catalog, carts and orders held in memory
//!   (development and tests)

mod in_memory;

pub use in_memory::InMemoryCommerceBackend;
