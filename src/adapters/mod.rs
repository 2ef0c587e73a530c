//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `action_config` - Configuration file loading and hot reload
//! - `commerce` - Commerce backend implementations (in-memory)
//! - `http` - Axum endpoints
//! - `remote` - reqwest clients for streaming and external actions
//! - `storage` - Preference persistence

pub mod action_config;
pub mod commerce;
pub mod http;
pub mod remote;
pub mod storage;

pub use action_config::{load, ConfigWatcher, ReloadError};
pub use commerce::InMemoryCommerceBackend;
pub use remote::{HttpActionClient, HttpActionClientConfig, HttpStreamTransport, HttpTransportConfig};
pub use storage::FilePreferenceStore;
