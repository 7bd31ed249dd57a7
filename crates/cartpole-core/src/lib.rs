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

//! # Cart-Pole Core
//!
//! Foundational crate containing the simulation primitives (terrain, contact
//! solving, cart-pole dynamics, deadline timing) and the interface contracts
//! the simulator uses to talk to its collaborators (control plugins and
//! render surfaces).

#![warn(missing_docs)]

pub mod config;
pub mod contact;
pub mod control;
pub mod math;
pub mod messages;
pub mod physics;
pub mod renderer;
pub mod terrain;
pub mod timer;

pub use config::SimulatorConfig;
pub use contact::Contact;
pub use math::Vec2;
pub use physics::{Cart, CartState, InitialState};
pub use terrain::{Crater, Terrain};
pub use timer::{Clock, DeadlineTimer, ManualClock, SystemClock};
