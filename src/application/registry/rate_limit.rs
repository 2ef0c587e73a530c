//! Fixed-window invocation limiter, one per rate-limited action.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::actions::RateLimitPolicy;

#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl FixedWindowLimiter {
    pub fn new(policy: &RateLimitPolicy) -> Self {
        Self {
            limit: policy.requests,
            window: policy.window(),
            state: Mutex::new(WindowState {
                count: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Counts one request, or returns how long until the window resets.
    pub async fn check(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        if now.duration_since(state.window_start) >= self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= self.limit {
            let reset_at = state.window_start + self.window;
            return Err(reset_at.saturating_duration_since(now));
        }

        state.count += 1;
        Ok(())
    }
}
