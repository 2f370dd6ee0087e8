// src/poll.rs

//! Bounded fixed-interval polling
//!
//! The appliance has no completion notifications for installs or reboots, so
//! progress is observed by probing on a fixed interval until a deadline.
//! Time is read through [`Clock`] so tests can run the loops instantly.

use crate::error::Result;
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of monotonic time and blocking sleeps
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`Instant`] and `thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only advances when slept on
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Probe interval and overall deadline of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Sleep-then-probe until the probe reports done or the deadline passes
///
/// The deadline is checked before each sleep, so the probe that starts in the
/// last interval before the deadline still runs. Returns `Ok(false)` on
/// timeout. Probe errors abort the loop.
pub fn poll_until<C, F>(clock: &C, policy: &PollPolicy, mut probe: F) -> Result<bool>
where
    C: Clock,
    F: FnMut() -> Result<bool>,
{
    let deadline = clock.now() + policy.timeout;

    while clock.now() < deadline {
        clock.sleep(policy.interval);
        if probe()? {
            return Ok(true);
        }
    }

    Ok(false)
}
