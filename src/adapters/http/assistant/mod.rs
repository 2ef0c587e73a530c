//! Assistant HTTP adapter - tool listing, chat turns and preferences.
//!
//! Provides endpoints for:
//! - Listing the tools enabled for a mode in a function-calling format
//! - Running a chat turn as an SSE stream or a JSON event list
//! - Reading and updating assistant preferences

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::AssistantAppState;
pub use routes::assistant_router;
