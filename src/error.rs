#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("Limit must allow at least one request")]
    ZeroLimitError,

    #[error("Interval must be positive, got {seconds}s")]
    NonPositiveIntervalError { seconds: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    #[error("No policy was configured for the rate limiter")]
    PolicyNotConfiguredError,

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Rate limit exceeded, retry after {retry_after}s")]
pub struct RateLimitExceededError {
    pub retry_after: f64,
}
