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
//! The live simulation: one cart on one terrain, driven by a [`Controller`].

use std::io;
use std::path::Path;

use cartpole_core::config::SimulatorConfig;
use cartpole_core::control::{Controller, KeyInfo, SimulationAction};
use cartpole_core::messages::MessageQueue;
use cartpole_core::physics::{Cart, CartParameters, CartState, InitialState};
use cartpole_core::renderer::{CameraPose, RenderSurface, SurfaceFactory};
use cartpole_core::terrain::Terrain;
use cartpole_infra::ImageSurfaceFactory;

use crate::recording::{Exporter, Frame, Recording, RecordingEvent};
use crate::scene::{paint_cart, Scenery};

/// Objects the user can grab and drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObject {
    /// The cart (with its pole).
    Cart,
}

/// Owns the world and runs it one tick at a time.
pub struct Simulator {
    config: SimulatorConfig,
    controller: Box<dyn Controller>,
    terrain: Terrain,
    cart: Cart,
    messages: MessageQueue,
    surfaces: Box<dyn SurfaceFactory>,
    recording: Option<Recording>,
    camera: CameraPose,
    camera_pending: bool,
    time: f64,
    manual_force: f64,
    last_force: f64,
    frozen: bool,
    priority_update: bool,
    terminate: bool,
}

impl Simulator {
    /// Lets `controller` adjust `config`, builds the world and resets it.
    pub fn new(mut config: SimulatorConfig, mut controller: Box<dyn Controller>) -> Self {
        let messages = MessageQueue::new();
        controller.configure(&mut config, messages.sender());

        let terrain = Terrain::build(&config.craters);
        let cart = Cart::new(CartParameters::from(&config));
        log::info!(
            "Simulator created for '{}' at {} Hz",
            config.engine_name.as_deref().unwrap_or("no engine"),
            config.action_frequency
        );

        let mut simulator = Self {
            camera: config.camera,
            config,
            controller,
            terrain,
            cart,
            messages,
            surfaces: Box::new(ImageSurfaceFactory::default()),
            recording: None,
            camera_pending: true,
            time: 0.0,
            manual_force: 0.0,
            last_force: 0.0,
            frozen: false,
            priority_update: false,
            terminate: false,
        };
        simulator.reset();
        simulator
    }

    /// Replaces the factory used for the offline export surfaces.
    pub fn with_surface_factory(mut self, surfaces: Box<dyn SurfaceFactory>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Applies a new configuration: the terrain is rebuilt and the cart re-seated.
    pub fn reload_config(&mut self, config: SimulatorConfig) {
        self.terrain = Terrain::build(&config.craters);
        self.cart.set_params(CartParameters::from(&config));
        self.cart.align(&self.terrain);
        self.config = config;
        log::info!("Configuration reloaded");
    }

    /// Restarts from the controller's initial state.
    ///
    /// A reset requested by the controller in answer to the reset itself is ignored.
    pub fn reset(&mut self) {
        let mut initial = InitialState::default();
        self.controller.initial_state(&mut initial);

        self.time = 0.0;
        self.manual_force = 0.0;
        self.last_force = 0.0;
        self.cart.reset(&initial, &self.terrain);

        match self.notify_controller() {
            SimulationAction::Terminate => self.request_terminate(),
            SimulationAction::Reset | SimulationAction::Continue => {}
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// While a recording is being exported the physics is frozen and only the
    /// export makes progress.
    pub fn tick(&mut self, dt: f64) {
        if self.frozen {
            self.process_recording();
            return;
        }

        let action = self.controller.apply_action();
        let force = action.resolve(self.manual_force);
        self.last_force = force;

        self.time += dt;
        if let Some(recording) = self.recording.as_mut() {
            recording.add_time(dt);
        }

        self.cart.tick(force, dt, &self.terrain);

        match self.notify_controller() {
            SimulationAction::Reset => {
                log::info!("Controller requested a reset at t={:.3}s", self.time);
                self.reset();
            }
            SimulationAction::Terminate => self.request_terminate(),
            SimulationAction::Continue => {}
        }

        self.process_recording();

        for line in self.messages.drain() {
            log::info!(target: "controller", "{}", line.trim_end());
        }
    }

    fn notify_controller(&mut self) -> SimulationAction {
        let feedback = self
            .controller
            .state_updated(self.time, &self.cart.state, self.camera);
        if let Some(camera) = feedback.camera {
            self.camera = camera;
            self.camera_pending = true;
        }
        feedback.simulation
    }

    fn request_terminate(&mut self) {
        if !self.terminate {
            log::info!("Controller requested termination at t={:.3}s", self.time);
        }
        self.terminate = true;
    }

    fn process_recording(&mut self) {
        let Some(recording) = self.recording.as_mut() else {
            return;
        };

        let snapshot = Frame {
            force: self.last_force,
            state: self.cart.state,
            camera: self.camera,
        };
        let exporter = Exporter {
            scenery: Scenery::new(&self.terrain, &self.config.markers),
            cart: self.cart.params(),
            surfaces: self.surfaces.as_ref(),
            output_root: &self.config.recording.output_root,
            frame_size: (
                self.config.recording.frame_width,
                self.config.recording.frame_height,
            ),
        };

        match recording.step(snapshot, &exporter) {
            Ok(RecordingEvent::ExportStarted { .. }) => {
                self.frozen = true;
                self.priority_update = true;
            }
            Ok(RecordingEvent::Finished) => self.discard_recording(),
            Ok(RecordingEvent::Captured | RecordingEvent::FrameExported(_)) => {}
            Err(e) => {
                log::error!("Recording abandoned: {e}");
                self.discard_recording();
            }
        }
    }

    fn discard_recording(&mut self) {
        self.recording = None;
        self.frozen = false;
        self.priority_update = false;
    }

    /// Manual push: `direction` (usually -1, 0 or 1) times the configured manual force.
    pub fn set_manual_action(&mut self, direction: f64) {
        self.manual_force = direction * self.config.manual_force;
    }

    /// Starts a recording, or stops the capture of the running one.
    pub fn start_stop_recording(&mut self) {
        match self.recording.as_mut() {
            None => {
                log::info!("Recording started");
                self.recording = Some(Recording::new(f64::from(self.config.action_frequency)));
            }
            Some(recording) => recording.stop(),
        }
    }

    /// Cancels the running recording, if any. The live simulation resumes at once.
    pub fn cancel(&mut self) {
        if let Some(recording) = self.recording.as_mut() {
            recording.cancel();
            self.process_recording();
        }
    }

    /// Forwards a key event to the controller; `true` if it was consumed.
    pub fn key_event(&mut self, key: &KeyInfo) -> bool {
        self.controller.key_pressed(key)
    }

    /// The object under the world point `(x, y)`, if it can be grabbed.
    pub fn object_at(&self, x: f64, y: f64) -> Option<SceneObject> {
        (!self.cart.frozen && self.cart.is_touched(x, y)).then_some(SceneObject::Cart)
    }

    /// Drags an object horizontally by `dx` meters.
    pub fn move_object_by(&mut self, object: SceneObject, dx: f64) {
        match object {
            SceneObject::Cart => self.cart.move_by(dx, &self.terrain),
        }
    }

    /// Holds an object still while it is dragged, or releases it.
    pub fn freeze_object(&mut self, object: SceneObject, freeze: bool) {
        match object {
            SceneObject::Cart => {
                self.cart.drop_momentum();
                self.cart.frozen = freeze;
            }
        }
    }

    /// Paints the scene. A camera requested by the controller is pushed to the
    /// surface first; otherwise the surface's camera (moved by the user) is adopted.
    pub fn paint(&mut self, surface: &mut dyn RenderSurface) {
        if self.camera_pending {
            surface.set_camera(self.camera);
            self.camera_pending = false;
        }
        self.camera = surface.viewport().camera;

        surface.begin_draw();
        Scenery::new(&self.terrain, &self.config.markers).paint(surface);
        paint_cart(surface, &self.cart.state, self.cart.params());
        surface.end_draw();
    }

    /// Appends the message history to `path`.
    pub fn save_log(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        self.messages.save(path)
    }

    /// Every controller message received so far.
    pub fn log_history(&self) -> &str {
        self.messages.history()
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// The terrain.
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// The live cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The live cart state.
    pub fn state(&self) -> &CartState {
        &self.cart.state
    }

    /// Simulated time since the last reset, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Force applied on the last tick.
    pub fn last_force(&self) -> f64 {
        self.last_force
    }

    /// The camera pose last exchanged with a surface or the controller.
    pub fn camera(&self) -> CameraPose {
        self.camera
    }

    /// The recording in progress, if any.
    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Whether live physics is suspended for an export.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the runner should tick without waiting for deadlines.
    pub fn has_priority_update(&self) -> bool {
        self.priority_update
    }

    /// Whether the controller asked to end the run.
    pub fn wants_to_terminate(&self) -> bool {
        self.terminate
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        log::info!("Simulator is being dropped. Shutting down the controller...");
        self.controller.shutdown();
    }
}
