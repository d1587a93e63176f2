//! Retry budget and linear backoff for transient service conditions
//!
//! Only the busy and in-progress responses draw on the budget; token expiry
//! is handled by re-login and never consumes it.

use std::time::Duration;

use async_trait::async_trait;

/// Sleeps between retries
///
/// Injected into the client so tests can observe backoff delays without
/// waiting for them.
#[async_trait]
pub trait BackoffSleeper: Send + Sync {
    /// Wait for `delay`
    async fn sleep(&self, delay: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl BackoffSleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Bounded countdown of transient-failure retries for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    limit: u32,
    used: u32,
}

impl RetryBudget {
    /// Budget allowing `limit` retries
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one retry; returns the number of retries used so far including
    /// this one, or `None` once the budget is spent
    pub fn consume(&mut self) -> Option<u32> {
        if self.used >= self.limit {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }

    /// Retries taken so far
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Retries still available
    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }
}

/// `base × attempts_used`
pub fn linear_delay(base: Duration, attempts_used: u32) -> Duration {
    base.saturating_mul(attempts_used)
}
