//! Elapsed-time driven timers.
//!
//! Nothing here reads the clock: the loop measures each tick once and feeds
//! the elapsed time in, so tests can drive time synthetically.

use std::time::Duration;

/// A countdown that expires once `timeout` has accumulated after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    timeout: Duration,
    elapsed: Duration,
    running: bool,
}

impl Timer {
    /// A stopped timer.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Start (or restart) from zero.
    pub fn start(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = false;
    }

    /// Advance a running timer.
    pub fn clock(&mut self, elapsed: Duration) {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(elapsed);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.running && self.elapsed >= self.timeout
    }
}

/// Minimum-interval gate for one outbound direction.
///
/// Starts due, so the first frame of a call is not held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingClock {
    interval: Duration,
    elapsed: Duration,
}

impl PacingClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: interval,
        }
    }

    pub fn clock(&mut self, elapsed: Duration) {
        self.elapsed = self.elapsed.saturating_add(elapsed);
    }

    pub fn is_due(&self) -> bool {
        self.elapsed >= self.interval
    }

    /// Call after each emission.
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
