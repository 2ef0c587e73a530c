//! Resilience module - failure taxonomy, classification and bounded retries.
//!
//! Raw failures are carried as [`OperationError`] through handlers, transports
//! and the retry loop. They are translated into a [`ClassifiedError`] only at
//! the boundary that needs a user-facing message.

mod classifier;
mod error;
mod retry;

pub use classifier::{classify, ClassifiedError, ErrorCode, VALIDATION_MARKER};
pub use error::OperationError;
pub use retry::{default_should_retry, retry, RetryPolicy, RetryPredicate};
