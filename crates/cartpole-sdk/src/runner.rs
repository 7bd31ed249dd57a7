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
//! Real-time pacing of a [`Simulator`].
//!
//! Each pump consumes due deadlines one interval at a time, running
//! `simulation_speed` ticks for every deadline. At most `max_catch_up` deadlines
//! are consumed per pump; when the loop is still behind after that, the timer is
//! moved to one interval behind now. Every tick is still simulated and
//! recorded, only real-time pacing is given up.

use std::thread;

use cartpole_core::config::SimulatorConfig;
use cartpole_core::timer::{Clock, DeadlineTimer, SystemClock};
use cartpole_telemetry::UsageEstimator;

use crate::simulator::Simulator;

/// What a single [`Runner::pump`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpReport {
    /// Simulator ticks run.
    pub ticks: u32,
    /// Deadlines consumed.
    pub deadlines: u32,
    /// Whether the remaining backlog was dropped.
    pub caught_up: bool,
    /// Whether the tick was a priority update (no deadline involved).
    pub priority: bool,
}

/// Drives a simulator from a [`DeadlineTimer`].
#[derive(Debug)]
pub struct Runner<C: Clock = SystemClock> {
    timer: DeadlineTimer<C>,
    usage: UsageEstimator,
    dt: f64,
    speed: u32,
    max_catch_up: u32,
}

impl Runner<SystemClock> {
    /// A runner paced by the system clock.
    pub fn new(config: &SimulatorConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }

    /// Pumps until the simulator asks to terminate, sleeping until each deadline.
    /// Returns the number of ticks run.
    pub fn run(&mut self, simulator: &mut Simulator) -> u64 {
        let mut ticks = 0u64;
        while !simulator.wants_to_terminate() {
            let report = self.pump(simulator);
            ticks += u64::from(report.ticks);
            if report.ticks == 0 {
                thread::sleep(self.timer.time_until_deadline());
            }
        }
        let elapsed = self.timer.stop();
        log::info!("Run finished: {ticks} ticks in {elapsed:.3}s");
        ticks
    }
}

impl<C: Clock> Runner<C> {
    /// A runner paced by `clock`. The timer starts immediately.
    pub fn with_clock(config: &SimulatorConfig, clock: C) -> Self {
        let mut runner = Self {
            timer: DeadlineTimer::new(clock),
            usage: UsageEstimator::default(),
            dt: 0.0,
            speed: 0,
            max_catch_up: 0,
        };
        runner.apply_config(config);
        runner.timer.start();
        runner
    }

    /// Picks up frequency, speed and catch-up changes.
    pub fn apply_config(&mut self, config: &SimulatorConfig) {
        self.timer.set_interval(config.tick_interval());
        self.usage.set_frequency(config.action_frequency);
        self.usage.clear();
        self.dt = config.dt();
        self.speed = config.simulation_speed;
        self.max_catch_up = config.max_catch_up.max(1);
    }

    /// Runs whatever is due now. Never blocks, and stops ticking as soon as the
    /// simulator asks to terminate.
    pub fn pump(&mut self, simulator: &mut Simulator) -> PumpReport {
        if simulator.has_priority_update() {
            simulator.tick(self.dt);
            self.timer.reset();
            return PumpReport {
                ticks: 1,
                priority: true,
                ..PumpReport::default()
            };
        }

        let mut report = PumpReport::default();
        while report.deadlines < self.max_catch_up && self.timer.deadline() {
            self.timer.next_interval();
            for _ in 0..self.speed {
                simulator.tick(self.dt);
                report.ticks += 1;
                if simulator.wants_to_terminate() {
                    break;
                }
            }
            self.usage.report(self.timer.load_ratio());
            report.deadlines += 1;
            if simulator.wants_to_terminate() {
                return report;
            }
        }

        if report.deadlines == self.max_catch_up && self.timer.deadline() {
            log::debug!(
                "Behind schedule after {} deadlines, dropping the backlog",
                report.deadlines
            );
            self.timer.catch_up();
            report.caught_up = true;
        }
        report
    }

    /// Smoothed share of each interval spent simulating, in percent.
    pub fn usage(&self) -> f64 {
        self.usage.usage()
    }

    /// The deadline timer.
    pub fn timer(&self) -> &DeadlineTimer<C> {
        &self.timer
    }
}
