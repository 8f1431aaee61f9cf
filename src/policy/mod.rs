mod fixed_interval;
mod sliding_window;

use std::borrow::Borrow;
use std::hash::Hash;

use crate::RateLimit;

pub use fixed_interval::{FixedIntervalPolicy, FixedIntervalState};
pub use sliding_window::{SlidingWindowPolicy, SlidingWindowState};

/// The admission contract shared by every policy.
///
/// Identities are tracked by an owned key `K` and looked up by any borrowed
/// form of it. Every call reads the policy's clock once and is atomic with
/// respect to other calls for the same identity. None of them fail: an
/// unknown identity is simply a fresh one.
pub trait Policy<K> {
    /// Whether a request from `id` would be admitted now. Never records one.
    fn can_send<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized;

    /// Admits and records a request from `id` if allowed, returning whether
    /// it was. A rejected request changes nothing.
    fn record<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized;

    /// Seconds until `id` may send again, `0.0` if it may send now.
    fn time_until_next_allowed<Q>(&self, id: &Q) -> f64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized;

    /// [`Self::record`] and a report of what is left, in one atomic step.
    fn consume<Q>(&self, id: &Q) -> RateLimit
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized;

    /// Forgets everything about `id`. Returns whether it was tracked.
    fn reset<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Drops the state of identities that no longer constrain anything,
    /// returning how many were dropped.
    fn purge_expired(&self) -> usize;

    fn is_tracked<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    fn tracked_identities(&self) -> usize;
}
