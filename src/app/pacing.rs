// SPDX-License-Identifier: GPL-3.0-only

//! Consumer cadence: the 1 Hz overlay counter and the optional fixed period

use crate::constants::COUNTER_TICK;
use std::time::{Duration, Instant};

/// Time source for the consumer loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`
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

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Counter advancing once per elapsed tick of run time
///
/// Ticks are scheduled from the start instant rather than from the last
/// observation, so late updates do not accumulate drift. At most one tick is
/// counted per update.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    value: u64,
    next_tick: Instant,
    tick: Duration,
}

impl FrameCounter {
    pub fn new(start: Instant) -> Self {
        Self::with_tick(start, COUNTER_TICK)
    }

    pub fn with_tick(start: Instant, tick: Duration) -> Self {
        Self {
            value: 0,
            next_tick: start + tick,
            tick,
        }
    }

    /// Advance if a tick boundary has passed; returns whether it did
    pub fn update(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.value += 1;
        self.next_tick += self.tick;
        true
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Fixed-period throttle
///
/// Sleeps away whatever is left of the period after a cycle. An overrun
/// cycle is not compensated: the next one simply starts late.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    period: Option<Duration>,
}

impl Pacer {
    pub fn new(period: Option<Duration>) -> Self {
        Self { period }
    }

    /// No throttling; cycles run back to back
    pub fn unpaced() -> Self {
        Self::default()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Sleep the remainder of the period for a cycle that began at `started`
    ///
    /// Returns how long it slept.
    pub fn pace<C: Clock>(&self, clock: &C, started: Instant) -> Duration {
        let Some(period) = self.period else {
            return Duration::ZERO;
        };
        let elapsed = clock.now().saturating_duration_since(started);
        match period.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => {
                clock.sleep(remaining);
                remaining
            }
            _ => Duration::ZERO,
        }
    }
}
