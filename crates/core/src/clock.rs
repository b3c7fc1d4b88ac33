// SPDX-License-Identifier: MIT

//! Monotonic time abstraction.
//!
//! The worker loop's idle-time bookkeeping (batch_idle) is driven by a
//! monotonic clock delta rather than by counting loop iterations, per the
//! REDESIGN FLAGS in SPEC_FULL.md: "idle-time bookkeeping by iteration
//! counting" is replaced with an actual time measurement. A `FakeClock` lets
//! tests exercise idle/force-flush timing without sleeping for real.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time for the runtime.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Real wall-clock time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Controllable clock for deterministic tests.
///
/// Starts at a real `Instant` captured at construction and advances only
/// when told to, so idle/force-flush thresholds can be crossed without a
/// real sleep.
#[derive(Clone)]
pub struct FakeClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock();
        *offset += delta;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
