use std::borrow::Borrow;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::clock::{seconds_of, Clock, MonotonicClock};
use crate::error::PolicyError;
use crate::policy::Policy;
use crate::storage::{InMemoryStorage, State, Storage};
use crate::{Duration, RateLimit};

/// Admits one request per identity every `interval`, counted from the last
/// admitted one. A request exactly `interval` after the last is admitted.
///
/// Once an identity has been admitted its last-seen time is kept for the life
/// of the policy; only [`Policy::reset`] forgets it.
pub struct FixedIntervalPolicy<K, C = MonotonicClock, S = InMemoryStorage<K, FixedIntervalState>> {
    interval: Duration,
    min_interval: f64,
    clock: C,
    storage: S,
    _phantom_data: PhantomData<fn() -> K>,
}

impl<K: Hash + Eq, C: Clock> FixedIntervalPolicy<K, C> {
    pub fn new(interval: Duration, clock: C) -> Result<Self, PolicyError> {
        Self::with_storage(interval, clock, InMemoryStorage::new())
    }
}

impl<K, C, S> FixedIntervalPolicy<K, C, S>
where
    C: Clock,
    S: Storage<K, FixedIntervalState>,
{
    pub fn with_storage(interval: Duration, clock: C, storage: S) -> Result<Self, PolicyError> {
        let min_interval = seconds_of(&interval);
        if min_interval <= 0.0 {
            return Err(PolicyError::NonPositiveIntervalError {
                seconds: min_interval,
            });
        }

        Ok(Self {
            interval,
            min_interval,
            clock,
            storage,
            _phantom_data: PhantomData,
        })
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }
}

impl<K, C, S> Policy<K> for FixedIntervalPolicy<K, C, S>
where
    C: Clock,
    S: Storage<K, FixedIntervalState>,
{
    fn can_send<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.storage.update(id, |state| {
            let now = self.clock.now();
            let allowed = state.is_allowed(self.min_interval, now);
            trace!(now, allowed, "Checking throttle");
            allowed
        })
    }

    fn record<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.consume(id).is_accepted()
    }

    fn time_until_next_allowed<Q>(&self, id: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.storage.update(id, |state| {
            state.calculate_wait(self.min_interval, self.clock.now())
        })
    }

    fn consume<Q>(&self, id: &Q) -> RateLimit
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.storage.update(id, |state| {
            let now = self.clock.now();

            let accepted = state.is_allowed(self.min_interval, now);
            if accepted {
                state.last_seen = Some(now);
                trace!(now, "Request admitted");
            } else {
                debug!(now, last_seen = ?state.last_seen, "Throttled");
            }

            RateLimit {
                remaining: usize::from(state.is_allowed(self.min_interval, now)),
                retry_after: state.calculate_wait(self.min_interval, now),
                accepted,
                limit: 1,
            }
        })
    }

    fn reset<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.storage.remove(id)
    }

    fn purge_expired(&self) -> usize {
        0
    }

    fn is_tracked<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.storage.contains(id)
    }

    fn tracked_identities(&self) -> usize {
        self.storage.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixedIntervalState {
    last_seen: Option<f64>,
}

impl State for FixedIntervalState {
    fn is_vacant(&self) -> bool {
        self.last_seen.is_none()
    }
}

impl FixedIntervalState {
    pub fn get_last_seen(&self) -> Option<f64> {
        self.last_seen
    }

    pub fn is_allowed(&self, min_interval: f64, now: f64) -> bool {
        match self.last_seen {
            Some(last_seen) => now - last_seen >= min_interval,
            None => true,
        }
    }

    pub fn calculate_wait(&self, min_interval: f64, now: f64) -> f64 {
        match self.last_seen {
            Some(last_seen) => (min_interval - (now - last_seen)).max(0.0),
            None => 0.0,
        }
    }
}
