use std::borrow::Borrow;
use std::hash::Hash;

use crate::clock::{Clock, MonotonicClock};
use crate::policy::{FixedIntervalPolicy, Policy, SlidingWindowPolicy};
use crate::RateLimit;

/// A policy picked at construction time, usable wherever either variant is.
pub enum RateLimiter<K, C = MonotonicClock> {
    SlidingWindow(SlidingWindowPolicy<K, C>),
    FixedInterval(FixedIntervalPolicy<K, C>),
}

impl<K, C> From<SlidingWindowPolicy<K, C>> for RateLimiter<K, C> {
    fn from(policy: SlidingWindowPolicy<K, C>) -> Self {
        Self::SlidingWindow(policy)
    }
}

impl<K, C> From<FixedIntervalPolicy<K, C>> for RateLimiter<K, C> {
    fn from(policy: FixedIntervalPolicy<K, C>) -> Self {
        Self::FixedInterval(policy)
    }
}

macro_rules! dispatch {
    ($self:ident, $policy:ident => $call:expr) => {
        match $self {
            RateLimiter::SlidingWindow($policy) => $call,
            RateLimiter::FixedInterval($policy) => $call,
        }
    };
}

impl<K: Hash + Eq, C: Clock> Policy<K> for RateLimiter<K, C> {
    fn can_send<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        dispatch!(self, policy => policy.can_send(id))
    }

    fn record<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        dispatch!(self, policy => policy.record(id))
    }

    fn time_until_next_allowed<Q>(&self, id: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        dispatch!(self, policy => policy.time_until_next_allowed(id))
    }

    fn consume<Q>(&self, id: &Q) -> RateLimit
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        dispatch!(self, policy => policy.consume(id))
    }

    fn reset<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, policy => policy.reset(id))
    }

    fn purge_expired(&self) -> usize {
        dispatch!(self, policy => policy.purge_expired())
    }

    fn is_tracked<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, policy => policy.is_tracked(id))
    }

    fn tracked_identities(&self) -> usize {
        dispatch!(self, policy => policy.tracked_identities())
    }
}
