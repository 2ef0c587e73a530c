//! Bounded retries with exponential backoff.
//!
//! The loop classifies each failure only to decide whether another attempt is
//! worthwhile. The error handed back to the caller is always the last raw
//! [`OperationError`], so the caller chooses where classification happens.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::{classify, ClassifiedError, ErrorCode, OperationError};

/// Decides whether a classified failure should be retried.
pub type RetryPredicate = Arc<dyn Fn(&ClassifiedError) -> bool + Send + Sync>;

/// Default retry decision: recoverable failures other than authentication.
pub fn default_should_retry(error: &ClassifiedError) -> bool {
    error.recoverable && error.code != ErrorCode::AuthError
}

/// Retry configuration for a single operation.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Base delay; the delay after failed attempt `n` (from 0) is `backoff * 2^n`.
    pub backoff: Duration,
    should_retry: Option<RetryPredicate>,
}

impl RetryPolicy {
    /// Creates a policy using the default retry predicate.
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
            should_retry: None,
        }
    }

    /// Policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Replaces the retry predicate.
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ClassifiedError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Delay to wait after the failed attempt numbered `attempt` (counting from 0).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }

    /// Applies the configured (or default) retry predicate.
    pub fn should_retry(&self, error: &ClassifiedError) -> bool {
        match &self.should_retry {
            Some(predicate) => predicate(error),
            None => default_should_retry(error),
        }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("custom_should_retry", &self.should_retry.is_some())
            .finish()
    }
}

/// Runs `operation` until it succeeds, the policy declines a retry, or
/// attempts run out.
///
/// # Example
///
/// ```ignore
/// let policy = RetryPolicy::new(3, Duration::from_millis(200));
/// let cart = retry(&policy, || backend.get_cart()).await?;
/// ```
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, OperationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OperationError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let classified = classify(&error);
        let remaining = attempts - attempt - 1;
        if remaining == 0 || !policy.should_retry(&classified) {
            tracing::debug!(
                attempt = attempt + 1,
                code = %classified.code,
                "Giving up on operation"
            );
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt = attempt + 1,
            remaining,
            delay_ms = delay.as_millis() as u64,
            code = %classified.code,
            error = %error,
            "Operation failed, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
