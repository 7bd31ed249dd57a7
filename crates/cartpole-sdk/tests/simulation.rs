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
use std::f64::consts::PI;

use cartpole_sdk::prelude::*;

struct Scripted {
    force: f64,
    start_x: f64,
    reset_past: f64,
    stop_after: f64,
}

impl Controller for Scripted {
    fn initial_state(&mut self, state: &mut InitialState) {
        state.x = self.start_x;
        state.theta = 0.05;
    }

    fn apply_action(&mut self) -> CartAction {
        CartAction::force(self.force)
    }

    fn state_updated(&mut self, time: f64, state: &CartState, _camera: CameraPose) -> Feedback {
        let simulation = if time >= self.stop_after {
            SimulationAction::Terminate
        } else if state.x > self.reset_past {
            SimulationAction::Reset
        } else {
            SimulationAction::Continue
        };
        Feedback {
            simulation,
            ..Feedback::default()
        }
    }
}

fn scripted(force: f64, start_x: f64, reset_past: f64, stop_after: f64) -> Simulator {
    Simulator::new(
        SimulatorConfig::default(),
        Box::new(Scripted {
            force,
            start_x,
            reset_past,
            stop_after,
        }),
    )
}

#[test]
fn initial_state_comes_from_the_controller() {
    let sim = scripted(0.0, 3.0, f64::MAX, f64::MAX);
    assert_eq!(sim.state().x, 3.0);
    assert_eq!(sim.state().theta, 0.05);
    assert_eq!(sim.time(), 0.0);
}

#[test]
fn controller_can_terminate() {
    let mut sim = scripted(0.0, 0.0, f64::MAX, 0.1 - 1e-9);
    let mut ticks = 0;
    while !sim.wants_to_terminate() {
        sim.tick(0.02);
        ticks += 1;
    }
    assert_eq!(ticks, 5);
}

#[test]
fn controller_can_reset() {
    let mut sim = scripted(20.0, 0.0, 0.2, f64::MAX);
    let mut resets = 0;
    let mut previous = 0.0;
    for _ in 0..200 {
        sim.tick(0.02);
        if sim.time() < previous {
            resets += 1;
            assert_eq!(sim.time(), 0.0);
            assert_eq!(sim.state().x, 0.0);
        }
        previous = sim.time();
    }
    assert!(resets > 0);
}

struct AlwaysReset;

impl Controller for AlwaysReset {
    fn state_updated(&mut self, _time: f64, _state: &CartState, _camera: CameraPose) -> Feedback {
        Feedback {
            simulation: SimulationAction::Reset,
            ..Feedback::default()
        }
    }
}

#[test]
fn reset_requested_during_reset_is_ignored() {
    let mut sim = Simulator::new(SimulatorConfig::default(), Box::new(AlwaysReset));
    sim.tick(0.02);
    assert_eq!(sim.time(), 0.0);
    assert!(!sim.wants_to_terminate());
}

#[test]
fn cart_never_leaves_the_world() {
    let mut sim = scripted(60.0, 97.0, f64::MAX, f64::MAX);
    let bound = 100.0 - 0.5;
    let mut bounced = false;
    for _ in 0..500 {
        sim.tick(0.02);
        let state = sim.state();
        assert!(state.x <= bound);
        if state.x == bound {
            bounced = true;
            assert!(state.dx <= 0.0);
        }
        assert!(state.theta >= -PI && state.theta < PI);
    }
    assert!(bounced);
}

#[test]
fn cart_stays_on_cratered_ground() {
    let mut config = SimulatorConfig::default();
    config.craters.push(Crater::new(3.0, 8.0, 1.0));
    let mut sim = Simulator::new(config, Box::new(NoopController));
    sim.set_manual_action(1.0);
    let mut deepest: f64 = 0.0;
    for _ in 0..300 {
        sim.tick(0.02);
        deepest = deepest.min(sim.state().y);
        assert!(sim.state().y <= 1e-9);
    }
    assert!(deepest < -0.5);
}
