//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (state machine trait, timestamps, validation errors)
//! - `actions` - Action configuration schema, parameter validation and response rendering
//! - `resilience` - Operation errors, classification and retry policy
//! - `streaming` - Stream events, SSE decoding and chat requests
//! - `context` - Assistant context snapshots, history and preferences

pub mod actions;
pub mod context;
pub mod foundation;
pub mod resilience;
pub mod streaming;
