pub mod clock;
pub mod error;
pub mod policy;
pub mod storage;

mod limiter;
mod rate_limit;

use std::hash::Hash;

use clock::{Clock, MonotonicClock};
use error::BuilderError;
use policy::{FixedIntervalPolicy, SlidingWindowPolicy};

pub use limiter::RateLimiter;
pub use rate_limit::RateLimit;

pub type Duration = chrono::Duration;

/// Which policy a [`RateLimiterBuilder`] should build, with its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyConfig {
    /// At most `limit` requests in any trailing `window`.
    SlidingWindow { limit: usize, window: Duration },
    /// At most one request per `interval`.
    FixedInterval { interval: Duration },
}

#[derive(Debug)]
pub struct RateLimiterBuilder<C: Clock = MonotonicClock> {
    policy: Option<PolicyConfig>,
    clock: C,
}

impl RateLimiterBuilder {
    pub fn new() -> Self {
        Self {
            policy: None,
            clock: MonotonicClock::new(),
        }
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiterBuilder<C> {
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replaces the time source, e.g. with a [`clock::ManualClock`] in tests.
    pub fn with_clock<Other: Clock>(self, clock: Other) -> RateLimiterBuilder<Other> {
        RateLimiterBuilder {
            policy: self.policy,
            clock,
        }
    }

    pub fn build<K: Hash + Eq>(self) -> Result<RateLimiter<K, C>, BuilderError> {
        let Some(policy) = self.policy else {
            return Err(BuilderError::PolicyNotConfiguredError);
        };

        let limiter: RateLimiter<K, C> = match policy {
            PolicyConfig::SlidingWindow { limit, window } => {
                SlidingWindowPolicy::new(limit, window, self.clock)?.into()
            }
            PolicyConfig::FixedInterval { interval } => {
                FixedIntervalPolicy::new(interval, self.clock)?.into()
            }
        };

        Ok(limiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::PolicyError;
    use crate::policy::Policy;

    fn build(policy: PolicyConfig) -> (RateLimiter<String, ManualClock>, ManualClock) {
        let clock = ManualClock::new(0.0);
        let limiter = RateLimiterBuilder::new()
            .with_policy(policy)
            .with_clock(clock.clone())
            .build()
            .expect("valid configuration");
        (limiter, clock)
    }

    /// Caller code written once against the shared contract.
    fn burst<P: Policy<String>>(limiter: &P, id: &str, requests: usize) -> usize {
        (0..requests).filter(|_| limiter.record(id)).count()
    }

    #[test]
    fn builds_sliding_window() {
        let (limiter, clock) = build(PolicyConfig::SlidingWindow {
            limit: 3,
            window: Duration::seconds(10),
        });

        assert!(matches!(limiter, RateLimiter::SlidingWindow(_)));
        assert_eq!(burst(&limiter, "u", 5), 3);
        assert_eq!(limiter.time_until_next_allowed("u"), 10.0);

        clock.set(10.0);
        assert_eq!(burst(&limiter, "u", 5), 3);
    }

    #[test]
    fn builds_fixed_interval() {
        let (limiter, clock) = build(PolicyConfig::FixedInterval {
            interval: Duration::seconds(10),
        });

        assert!(matches!(limiter, RateLimiter::FixedInterval(_)));
        assert_eq!(burst(&limiter, "u", 5), 1);
        assert_eq!(limiter.time_until_next_allowed("u"), 10.0);

        clock.set(10.0);
        assert_eq!(burst(&limiter, "u", 5), 1);
    }

    #[test]
    fn policies_differ_only_in_policy() {
        let limiters = [
            build(PolicyConfig::SlidingWindow {
                limit: 1,
                window: Duration::seconds(10),
            }),
            build(PolicyConfig::FixedInterval {
                interval: Duration::seconds(10),
            }),
        ];

        for (limiter, clock) in &limiters {
            assert!(limiter.record("a"));
            assert!(!limiter.record("a"));
            assert!(limiter.can_send("b"));

            clock.set(5.0);
            assert_eq!(limiter.time_until_next_allowed("a"), 5.0);
            assert!(limiter.consume("a").ensure_accepted().is_err());

            assert!(limiter.reset("a"));
            assert!(limiter.record("a"));
            assert_eq!(limiter.tracked_identities(), 1);
        }
    }

    #[test]
    fn missing_policy_is_rejected() {
        let result = RateLimiterBuilder::new().build::<String>();
        assert!(matches!(result, Err(BuilderError::PolicyNotConfiguredError)));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let result = RateLimiterBuilder::new()
            .with_policy(PolicyConfig::SlidingWindow {
                limit: 0,
                window: Duration::seconds(1),
            })
            .build::<String>();
        assert!(matches!(
            result,
            Err(BuilderError::Policy(PolicyError::ZeroLimitError))
        ));

        let result = RateLimiterBuilder::new()
            .with_policy(PolicyConfig::FixedInterval {
                interval: Duration::milliseconds(-5),
            })
            .build::<u64>();
        assert!(matches!(
            result,
            Err(BuilderError::Policy(PolicyError::NonPositiveIntervalError { .. }))
        ));
    }

    #[test]
    fn default_clock_admits_immediately() {
        let limiter = RateLimiterBuilder::new()
            .with_policy(PolicyConfig::FixedInterval {
                interval: Duration::seconds(60),
            })
            .build::<u64>()
            .expect("valid configuration");

        assert!(limiter.record(&7u64));
        assert!(!limiter.record(&7u64));
        assert!(limiter.record(&8u64));
        assert!(limiter.time_until_next_allowed(&7u64) > 59.0);
    }
}
