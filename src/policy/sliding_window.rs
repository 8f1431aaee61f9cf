use std::borrow::Borrow;
use std::collections::VecDeque;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::clock::{seconds_of, Clock, MonotonicClock};
use crate::error::PolicyError;
use crate::policy::Policy;
use crate::storage::{InMemoryStorage, State, Storage};
use crate::{Duration, RateLimit};

/// Admits at most `limit` requests per identity in any trailing window.
///
/// The window is half-open, `(now - window, now]`: a hit recorded exactly
/// `window` seconds ago no longer counts.
pub struct SlidingWindowPolicy<K, C = MonotonicClock, S = InMemoryStorage<K, SlidingWindowState>> {
    limit: usize,
    interval: Duration,
    window: f64,
    clock: C,
    storage: S,
    _phantom_data: PhantomData<fn() -> K>,
}

impl<K: Hash + Eq, C: Clock> SlidingWindowPolicy<K, C> {
    pub fn new(limit: usize, interval: Duration, clock: C) -> Result<Self, PolicyError> {
        Self::with_storage(limit, interval, clock, InMemoryStorage::new())
    }
}

impl<K, C, S> SlidingWindowPolicy<K, C, S>
where
    C: Clock,
    S: Storage<K, SlidingWindowState>,
{
    pub fn with_storage(
        limit: usize,
        interval: Duration,
        clock: C,
        storage: S,
    ) -> Result<Self, PolicyError> {
        if limit == 0 {
            return Err(PolicyError::ZeroLimitError);
        }

        let window = seconds_of(&interval);
        if window <= 0.0 {
            return Err(PolicyError::NonPositiveIntervalError { seconds: window });
        }

        Ok(Self {
            limit,
            interval,
            window,
            clock,
            storage,
            _phantom_data: PhantomData,
        })
    }

    pub fn get_limit(&self) -> usize {
        self.limit
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    fn prune(&self, state: &mut SlidingWindowState, now: f64) {
        let expired = state.prune(now, self.window);

        if expired > 0 && state.is_vacant() {
            debug!(expired, "Sliding window emptied, releasing identity");
        }
    }
}

impl<K, C, S> Policy<K> for SlidingWindowPolicy<K, C, S>
where
    C: Clock,
    S: Storage<K, SlidingWindowState>,
{
    fn can_send<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.storage.update(id, |state| {
            let now = self.clock.now();
            self.prune(state, now);

            let allowed = state.get_hit_count() < self.limit;
            trace!(now, hits = state.get_hit_count(), allowed, "Checking sliding window");
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
            let now = self.clock.now();
            self.prune(state, now);
            state.calculate_time_for_slot(self.limit, self.window, now)
        })
    }

    fn consume<Q>(&self, id: &Q) -> RateLimit
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.storage.update(id, |state| {
            let now = self.clock.now();
            self.prune(state, now);

            let accepted = state.get_hit_count() < self.limit;
            if accepted {
                state.add(now);
                trace!(now, hits = state.get_hit_count(), "Request admitted");
            } else {
                debug!(now, limit = self.limit, "Sliding window limit reached");
            }

            RateLimit {
                remaining: self.limit.saturating_sub(state.get_hit_count()),
                retry_after: state.calculate_time_for_slot(self.limit, self.window, now),
                accepted,
                limit: self.limit,
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
        let now = self.clock.now();
        let released = self.storage.sweep(|_, state| {
            state.prune(now, self.window);
        });

        if released > 0 {
            debug!(released, "Purged idle identities");
        }

        released
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

/// Timestamps of the admitted requests still inside the window, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowState {
    hits: VecDeque<f64>,
}

impl State for SlidingWindowState {
    fn is_vacant(&self) -> bool {
        self.hits.is_empty()
    }
}

impl SlidingWindowState {
    /// Drops every hit at or before `now - window` and returns how many were
    /// dropped. Hits arrive in time order, so only the front can expire.
    pub fn prune(&mut self, now: f64, window: f64) -> usize {
        let cutoff = now - window;
        let before = self.hits.len();

        while self.hits.front().is_some_and(|&hit| hit <= cutoff) {
            self.hits.pop_front();
        }

        before - self.hits.len()
    }

    pub fn add(&mut self, now: f64) {
        self.hits.push_back(now);
    }

    pub fn get_hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn get_oldest_hit(&self) -> Option<f64> {
        self.hits.front().copied()
    }

    /// Seconds until the oldest hit leaves the window, or zero if a slot is
    /// already free. Expects the state to be pruned for `now`.
    pub fn calculate_time_for_slot(&self, limit: usize, window: f64, now: f64) -> f64 {
        if self.hits.len() < limit {
            return 0.0;
        }

        match self.get_oldest_hit() {
            Some(oldest) => (oldest + window - now).max(0.0),
            None => 0.0,
        }
    }
}
