//! Injectable clock so `RateLimiter` tests are deterministic without sleeping.
//!
//! Sliding windows are wall-clock, not monotonic: when the clock moves
//! backwards the limiter is biased toward over-counting rather than
//! under-counting.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of "now" for the rate limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only advances when told to -- used by tests that need to
/// simulate minute/day window boundaries without sleeping.
#[derive(Clone)]
pub struct FixedClock {
    inner: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        *self.inner.lock() += delta;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.inner.lock() = to;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.lock()
    }
}
