//! Application layer - orchestrates domain operations over the ports.
//!
//! - `registry` - resolves configured actions into an invocable registry
//! - `context_assembler` - per-turn context snapshots
//! - `streaming_client` - consumes SSE streams as typed events
//! - `handlers` - built-in commerce actions and the chat turn handler

pub mod handlers;
pub mod registry;

mod context_assembler;
mod streaming_client;

pub use context_assembler::{trim_history, ContextAssembler};
pub use handlers::{commerce_handlers, StreamActionHandler};
pub use registry::{ActionRegistry, ModeRegistries, RegistryDeps, RegistryHandle};
pub use streaming_client::{
    StreamClientConfig, StreamClientError, StreamObserver, StreamOutcome, StreamingClient,
};
