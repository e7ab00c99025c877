//! Time source for the polling loops
//!
//! Bank settling and conditioning progress both poll the recorder on a fixed interval. They
//! read time and sleep through a [`Clock`] so tests can run them against a [`ManualClock`]
//! without real delays.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time that can also block the caller
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock that only moves when slept on or advanced
///
/// Clones share the same time, so a test can hand one clone to a controller and keep another
/// to inspect or advance.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock starting at zero elapsed time
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner()) += duration;
    }

    /// Simulated time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
