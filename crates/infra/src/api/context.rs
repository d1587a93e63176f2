//! Per-call deadline and cancellation
//!
//! Every dispatch runs under a [`CallContext`]. Each suspension point of the
//! dispatcher (network I/O, the session lock, backoff sleeps) is wrapped in
//! [`CallContext::guard`], so a caller is never blocked past its deadline and
//! can tell "deadline exceeded" apart from a service rejection.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::errors::ApiError;

/// Fallback deadline when `now + timeout` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline and cancellation signal bounding one logical call
///
/// Cloning shares the cancellation token, so cancelling any clone aborts
/// every call running under it.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl CallContext {
    /// Deadline `timeout` from now
    ///
    /// Timeouts too large to add to the current instant are clamped to a
    /// deadline decades away.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self::with_deadline(deadline)
    }

    /// Context expiring at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline, cancel: CancellationToken::new() }
    }

    /// Also abort when `token` is cancelled
    #[must_use]
    pub fn cancelled_by(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Instant after which guarded futures fail
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once cancelled or past the deadline
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Run `fut` until it completes, the deadline passes, or the call is
    /// cancelled, whichever comes first
    ///
    /// # Errors
    /// `ApiError::Cancelled` on cancellation, `ApiError::DeadlineExceeded`
    /// once the deadline elapses.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, ApiError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = tokio::time::timeout_at(self.deadline, fut) => {
                result.map_err(|_| ApiError::DeadlineExceeded)
            }
        }
    }
}
