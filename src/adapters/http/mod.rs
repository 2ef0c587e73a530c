//! HTTP adapters - REST and SSE endpoints.

pub mod assistant;

pub use assistant::{assistant_router, AssistantAppState};
