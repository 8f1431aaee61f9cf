use crate::error::RateLimitExceededError;
use crate::Duration;

/// Outcome of a [`Policy::consume`](crate::policy::Policy::consume) call
/// for a particular identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimit {
    pub(crate) remaining: usize,
    pub(crate) retry_after: f64,
    pub(crate) accepted: bool,
    pub(crate) limit: usize,
}

impl RateLimit {
    /// Returns how many more requests would be admitted right now.
    pub fn get_remaining(&self) -> usize {
        self.remaining
    }

    /// Seconds the identity must wait before its next request can be
    /// admitted. Zero while there is room left.
    pub fn get_retry_after(&self) -> f64 {
        self.retry_after
    }

    /// Same as [`Self::get_retry_after()`], rounded up to whole microseconds.
    pub fn retry_after_duration(&self) -> Duration {
        Duration::microseconds((self.retry_after * 1e6).ceil() as i64)
    }

    /// Returns a result reflecting whether this request was admitted.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Requests admitted per window (1 for the fixed-interval throttle).
    pub fn get_limit(&self) -> usize {
        self.limit
    }

    /// Same as [`Self::is_accepted()`], but will return
    /// Err(RateLimitExceededError) if the request was rejected.
    pub fn ensure_accepted(&self) -> Result<(), RateLimitExceededError> {
        if !self.accepted {
            return Err(RateLimitExceededError {
                retry_after: self.retry_after,
            });
        }

        Ok(())
    }
}
