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
//! The public-facing API of the cart-pole simulator.
//!
//! A [`Simulator`] owns the world and advances it tick by tick under a
//! [`Controller`](cartpole_core::control::Controller). A [`Runner`] paces it in
//! real time. Recordings are captured and exported through the simulator.

#![warn(missing_docs)]

pub mod recording;
pub mod runner;
pub mod scene;
pub mod simulator;

pub use cartpole_core;
pub use cartpole_infra;
pub use cartpole_telemetry::{init_logging, UsageEstimator};

pub use recording::{Frame, Recording, RecordingError, RecordingEvent, RecordingState};
pub use runner::{PumpReport, Runner};
pub use simulator::{SceneObject, Simulator};

/// The types a controller implementation usually needs.
pub mod prelude {
    pub use cartpole_core::config::{ObjectParameters, RecordingConfig, SimulatorConfig};
    pub use cartpole_core::control::{
        ActionMode, CartAction, Controller, Feedback, KeyInfo, KeyState, NoopController,
        SimulationAction,
    };
    pub use cartpole_core::messages::MessageSender;
    pub use cartpole_core::physics::{CartState, InitialState};
    pub use cartpole_core::renderer::{CameraPose, Color, Marker};
    pub use cartpole_core::terrain::Crater;

    pub use crate::{Runner, Simulator};
}
