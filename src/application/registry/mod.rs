//! Action registry - resolves configured actions into callable tools.
//!
//! An [`ActionRegistry`] is built from a validated configuration, a mode and
//! injected collaborators. It is immutable; reloads build a fresh registry and
//! publish it through a [`RegistryHandle`].

mod effective;
mod error;
mod handle;
mod rate_limit;
mod registry;
mod tool;

pub use effective::{effective_definition, NON_OVERRIDABLE_FIELDS};
pub use error::{InvokeError, RegistryError};
pub use handle::{ModeRegistries, RegistryHandle};
pub use rate_limit::FixedWindowLimiter;
pub use registry::{ActionRegistry, RegistryDeps};
pub use tool::{ToolDefinition, ToolFormat};
