//! Monotonic clock abstraction.
//!
//! Contexts read time only through [`Clock`] so tests can freeze or step it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic instants.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FrozenClock {
    instant: Instant,
}

impl FrozenClock {
    pub fn new(instant: Instant) -> Self {
        Self { instant }
    }
}

impl Default for FrozenClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> Instant {
        self.instant
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward by `step`.
    ///
    /// A step past the last representable instant stops the clock close to
    /// that instant instead.
    pub fn advance(&self, step: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        let mut step = step;
        while !step.is_zero() && self.origin.checked_add(offset.saturating_add(step)).is_none() {
            step /= 2;
        }
        *offset = offset.saturating_add(step);
    }

    /// Total time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin.checked_add(self.elapsed()).unwrap_or(self.origin)
    }
}
