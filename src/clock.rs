//! Time sources for the policies.
//!
//! Every policy reads "now" as `f64` seconds from a [`Clock`]. Readings must
//! never decrease for a given clock; a clock that moves backward leaves the
//! policies' answers unspecified.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::Duration;

pub trait Clock: Send + Sync {
    /// Current time in seconds since the clock's epoch.
    fn now(&self) -> f64;
}

/// Seconds elapsed since the clock was created. The default time source.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Wall-clock seconds since the Unix epoch.
///
/// Not monotonic: an adjustment of the system time may move it backward, and
/// the policies give no guarantees once that happens. Only suitable where
/// readings must line up with external Unix timestamps; prefer
/// [`MonotonicClock`] otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        let now = chrono::Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
    }
}

/// Synthetic time that only moves when told to.
///
/// Clones share the same reading, so a test can hand one clone to a policy
/// and keep another to drive it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, seconds: f64) {
        *self.now.lock() = seconds;
    }

    pub fn advance(&self, by: Duration) {
        self.advance_secs(seconds_of(&by));
    }

    pub fn advance_secs(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Converts a chrono duration into fractional seconds.
pub(crate) fn seconds_of(duration: &Duration) -> f64 {
    duration.num_seconds() as f64 + f64::from(duration.subsec_nanos()) / 1e9
}
