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

//! Control-plugin contract.
//!
//! A [`Controller`] decides, every tick, what force is applied to the cart and
//! may steer the simulation (reset, terminate) or the camera after seeing the
//! new state. How a controller is found or loaded is not the simulator's
//! concern; it only ever sees this trait. Every method has a default, so
//! [`NoopController`] is simply an empty implementation.
//!
//! Controllers are driven from the tick path only and need not be `Send`.

use crate::config::SimulatorConfig;
use crate::messages::MessageSender;
use crate::physics::{CartState, InitialState};
use crate::renderer::CameraPose;

/// How the force of a [`CartAction`] combines with manual input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionMode {
    /// No force at all.
    NoAction,
    /// Apply [`CartAction::force`].
    ApplyForce,
    /// Ignore the controller force and apply the manual input.
    #[default]
    ManualAction,
    /// Apply the manual input if there is any, the controller force otherwise.
    ForceUnlessManual,
}

/// The decision a controller takes for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartAction {
    /// Horizontal force in newtons.
    pub force: f64,
    /// How `force` combines with manual input.
    pub mode: ActionMode,
}

impl CartAction {
    /// Apply `force` regardless of manual input.
    pub const fn force(force: f64) -> Self {
        Self {
            force,
            mode: ActionMode::ApplyForce,
        }
    }

    /// Defer to manual input.
    pub const fn manual() -> Self {
        Self {
            force: 0.0,
            mode: ActionMode::ManualAction,
        }
    }

    /// The force actually applied, given the current manual input.
    pub fn resolve(&self, manual: f64) -> f64 {
        match self.mode {
            ActionMode::NoAction => 0.0,
            ActionMode::ApplyForce => self.force,
            ActionMode::ManualAction => manual,
            ActionMode::ForceUnlessManual if manual != 0.0 => manual,
            ActionMode::ForceUnlessManual => self.force,
        }
    }
}

/// Flow control requested by a controller after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationAction {
    /// Carry on.
    #[default]
    Continue,
    /// Restart from the initial state.
    Reset,
    /// End the run.
    Terminate,
}

/// A controller's answer to a state update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Feedback {
    /// Camera pose to switch to, if any.
    pub camera: Option<CameraPose>,
    /// Requested change of the simulation flow.
    pub simulation: SimulationAction,
}

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// The key was released.
    Released,
    /// The key was pressed.
    Pressed,
}

/// A keyboard event forwarded to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Platform key code.
    pub code: u32,
    /// Translated character, if any.
    pub character: Option<char>,
    /// Press or release.
    pub state: KeyState,
}

/// The decision-making plugin driving the cart.
pub trait Controller {
    /// Called once before the simulation starts. The controller may adjust the
    /// configuration and keep `messages` to post log lines later.
    fn configure(&mut self, _config: &mut SimulatorConfig, _messages: MessageSender) {}

    /// Called on every (re)start to choose the initial state.
    fn initial_state(&mut self, _state: &mut InitialState) {}

    /// Called at the start of every tick.
    fn apply_action(&mut self) -> CartAction {
        CartAction::manual()
    }

    /// Called after every tick (and after a reset) with the new state.
    fn state_updated(&mut self, _time: f64, _state: &CartState, _camera: CameraPose) -> Feedback {
        Feedback::default()
    }

    /// A key event; returns `true` if the controller consumed it.
    fn key_pressed(&mut self, _key: &KeyInfo) -> bool {
        false
    }

    /// Called once when the simulator is dropped.
    fn shutdown(&mut self) {}
}

/// A controller that never acts: manual input only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopController;

impl Controller for NoopController {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_follows_mode() {
        assert_eq!(CartAction::force(3.0).resolve(10.0), 3.0);
        assert_eq!(CartAction::manual().resolve(10.0), 10.0);
        let hybrid = CartAction {
            force: 3.0,
            mode: ActionMode::ForceUnlessManual,
        };
        assert_eq!(hybrid.resolve(0.0), 3.0);
        assert_eq!(hybrid.resolve(-10.0), -10.0);
        let idle = CartAction {
            force: 3.0,
            mode: ActionMode::NoAction,
        };
        assert_eq!(idle.resolve(10.0), 0.0);
    }

    #[test]
    fn noop_controller_defers_to_manual_input() {
        let mut controller = NoopController;
        assert_eq!(controller.apply_action(), CartAction::manual());
        let feedback = controller.state_updated(0.0, &CartState::default(), CameraPose::default());
        assert_eq!(feedback, Feedback::default());
    }
}
