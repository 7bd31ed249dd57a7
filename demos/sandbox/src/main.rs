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

//! Headless sandbox: balances the pole in real time, records a short clip and
//! exports it under the configured output root.
//!
//! Usage: `sandbox [config.json]`

use std::thread;

use anyhow::{Context, Result};
use cartpole_sdk::prelude::*;
use cartpole_sdk::{init_logging, RecordingState};

const RECORD_FROM: f64 = 1.0;
const RECORD_UNTIL: f64 = 3.0;
const RUN_UNTIL: f64 = 4.0;

/// Proportional-derivative balancer on the pole angle, with a weak pull back
/// towards the origin.
#[derive(Default)]
struct Balancer {
    messages: Option<MessageSender>,
    state: CartState,
    updates: u64,
}

impl Balancer {
    const ANGLE_GAIN: f64 = 60.0;
    const ANGULAR_RATE_GAIN: f64 = 10.0;
    const POSITION_GAIN: f64 = 0.5;
    const VELOCITY_GAIN: f64 = 1.5;

    fn post(&self, message: String) {
        if let Some(messages) = &self.messages {
            messages.post(message);
        }
    }
}

impl Controller for Balancer {
    fn configure(&mut self, config: &mut SimulatorConfig, messages: MessageSender) {
        config
            .engine_name
            .get_or_insert_with(|| "pd-balancer".to_owned());
        messages.post(format!("Balancing at {} Hz\n", config.action_frequency));
        self.messages = Some(messages);
    }

    fn initial_state(&mut self, state: &mut InitialState) {
        state.theta = 0.1;
    }

    fn apply_action(&mut self) -> CartAction {
        let s = &self.state;
        CartAction {
            force: Self::ANGLE_GAIN * s.theta
                + Self::ANGULAR_RATE_GAIN * s.dtheta
                + Self::POSITION_GAIN * s.x
                + Self::VELOCITY_GAIN * s.dx,
            // Arrow keys still win in an interactive front end.
            mode: ActionMode::ForceUnlessManual,
        }
    }

    fn state_updated(&mut self, time: f64, state: &CartState, camera: CameraPose) -> Feedback {
        self.state = *state;
        self.updates += 1;
        if self.updates % 50 == 0 {
            self.post(format!(
                "t={time:.2}s theta={:+.4} x={:+.3}\n",
                state.theta, state.x
            ));
        }

        let simulation = if time >= RUN_UNTIL {
            SimulationAction::Terminate
        } else if state.theta.abs() > 1.0 {
            self.post(format!("Pole fell at t={time:.2}s, resetting\n"));
            SimulationAction::Reset
        } else {
            SimulationAction::Continue
        };
        Feedback {
            camera: Some(CameraPose::new(state.x, camera.y, camera.zoom)),
            simulation,
        }
    }

    fn shutdown(&mut self) {
        log::info!("Balancer shut down after {} updates", self.updates);
    }
}

fn main() -> Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulatorConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration from '{path}'"))?,
        None => SimulatorConfig::default(),
    };
    let log_file = config.log_file.clone();

    let mut runner = Runner::new(&config);
    let mut simulator = Simulator::new(config, Box::new(Balancer::default()));
    let mut recorded = false;

    while !simulator.wants_to_terminate() {
        let report = runner.pump(&mut simulator);
        if report.ticks == 0 {
            thread::sleep(runner.timer().time_until_deadline());
            continue;
        }

        match simulator.recording().map(|r| r.state()) {
            None if !recorded && simulator.time() >= RECORD_FROM => {
                simulator.start_stop_recording();
                recorded = true;
            }
            Some(RecordingState::Capturing) if simulator.time() >= RECORD_UNTIL => {
                simulator.start_stop_recording();
            }
            _ => {}
        }
    }

    log::info!(
        "Finished at t={:.2}s, loop usage {:.1}%",
        simulator.time(),
        runner.usage()
    );

    if let Some(path) = log_file {
        simulator
            .save_log(&path)
            .with_context(|| format!("Failed to save the log to '{}'", path.display()))?;
    }
    Ok(())
}
