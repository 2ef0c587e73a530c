//! Foundation module - Shared domain primitives.
//!
//! Contains the small vocabulary reused across the action, streaming and
//! context modules: timestamps, validation errors and the state machine trait.

mod errors;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
