// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Deadline timing for the real-time loop.
//!
//! [`DeadlineTimer`] keeps a reference point and reports when one interval has
//! elapsed since it. Consuming a deadline with [`DeadlineTimer::next_interval`]
//! advances the reference by exactly one interval, so the phase of the clock is
//! never lost; [`DeadlineTimer::catch_up`] drops accumulated lag instead.
//!
//! Time comes from a [`Clock`], so the timer can run against the monotonic
//! system clock or against a [`ManualClock`] stepped by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source, expressed as time elapsed since an arbitrary origin.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Duration;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of creation.
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
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Creates a clock standing at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// A fixed-interval deadline clock.
#[derive(Debug, Clone)]
pub struct DeadlineTimer<C: Clock = SystemClock> {
    clock: C,
    active: bool,
    reference: Duration,
    interval: Duration,
}

impl<C: Clock> DeadlineTimer<C> {
    /// Creates an inactive timer with a zero interval.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            active: false,
            reference: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    /// Activates the timer with its reference point at the current time.
    pub fn start(&mut self) {
        self.reference = self.clock.now();
        self.active = true;
    }

    /// Deactivates the timer and returns the seconds elapsed since the reference point.
    pub fn stop(&mut self) -> f64 {
        self.active = false;
        self.elapsed().as_secs_f64()
    }

    /// Moves the reference point to the current time.
    pub fn reset(&mut self) {
        self.reference = self.clock.now();
    }

    /// Whether [`DeadlineTimer::start`] has been called (and not stopped since).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Sets the interval between deadlines.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.reference)
    }

    fn is_armed(&self) -> bool {
        self.active && !self.interval.is_zero()
    }

    /// Seconds elapsed since the reference point, or `0` when the timer is not armed.
    pub fn time_from_reference(&self) -> f64 {
        if !self.is_armed() {
            return 0.0;
        }
        self.elapsed().as_secs_f64()
    }

    /// Elapsed time since the reference point as a fraction of the interval.
    ///
    /// Sampled right after a deadline has been consumed and processed, this is
    /// the share of the interval the processing used up.
    pub fn load_ratio(&self) -> f64 {
        if !self.is_armed() {
            return 0.0;
        }
        self.elapsed().as_secs_f64() / self.interval.as_secs_f64()
    }

    /// Time left until the next deadline (zero once it has passed).
    pub fn time_until_deadline(&self) -> Duration {
        if !self.is_armed() {
            return Duration::ZERO;
        }
        self.interval.saturating_sub(self.elapsed())
    }

    /// Whether the current time has reached the deadline. Has no side effect.
    pub fn deadline(&self) -> bool {
        self.is_armed() && self.elapsed() >= self.interval
    }

    /// Consumes one deadline by advancing the reference point by exactly one interval.
    pub fn next_interval(&mut self) {
        self.reference += self.interval;
    }

    /// Drops accumulated lag: the reference point becomes one interval behind now,
    /// so the next deadline is due immediately but no further backlog remains.
    pub fn catch_up(&mut self) {
        self.reference = self.clock.now().saturating_sub(self.interval);
    }
}
