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

//! Simulator configuration.
//!
//! A single [`SimulatorConfig`] value is created at startup (usually parsed from
//! JSON and then adjusted by the control plugin) and handed explicitly to every
//! component that needs it. Nothing in the simulator reads process-wide state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::renderer::{CameraPose, Marker};
use crate::terrain::Crater;

/// Size, mass and linear damping of a simulated body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectParameters {
    /// Width of the cart or length of the pole, in meters.
    pub size: f64,
    /// Mass in kilograms.
    pub mass: f64,
    /// Damping coefficient subtracted proportionally to velocity.
    pub damping: f64,
}

/// Settings of the offline export performed by a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Width of the exported images, in pixels.
    pub frame_width: u32,
    /// Height of the exported images, in pixels.
    pub frame_height: u32,
    /// Directory in which numbered `recordingN` folders are created.
    pub output_root: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            output_root: PathBuf::from("."),
        }
    }
}

/// Complete simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Display name of the control plugin, if it chose to provide one.
    pub engine_name: Option<String>,
    /// How many ticks per second are simulated (and how often the controller acts).
    pub action_frequency: u32,
    /// Number of ticks processed per scheduler deadline.
    pub simulation_speed: u32,
    /// Gravitational acceleration in m/s².
    pub gravity: f64,
    /// Force applied by manual input at full deflection, in newtons.
    pub manual_force: f64,
    /// Cart parameters (`size` is the cart width).
    pub cart: ObjectParameters,
    /// Pole parameters (`size` is the pole length).
    pub pole: ObjectParameters,
    /// Initial camera pose.
    pub camera: CameraPose,
    /// Craters spliced into the terrain, in ascending order of position.
    pub craters: Vec<Crater>,
    /// Coloured vertical stripes painted behind the scene.
    pub markers: Vec<Marker>,
    /// Convergence tolerance of the wheel contact search, in meters.
    pub contact_tolerance: f64,
    /// Maximum number of deadlines consumed in one burst before the scheduler
    /// gives up on real-time pacing and resynchronizes.
    pub max_catch_up: u32,
    /// Offline export settings.
    pub recording: RecordingConfig,
    /// File the message log is appended to on shutdown.
    pub log_file: Option<PathBuf>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            engine_name: None,
            action_frequency: 50,
            simulation_speed: 1,
            gravity: 9.81,
            manual_force: 10.0,
            cart: ObjectParameters {
                size: 1.0,
                mass: 1.0,
                damping: 0.5,
            },
            pole: ObjectParameters {
                size: 1.0,
                mass: 0.1,
                damping: 0.5,
            },
            camera: CameraPose::default(),
            craters: Vec::new(),
            markers: Vec::new(),
            contact_tolerance: 0.01,
            max_catch_up: 3,
            recording: RecordingConfig::default(),
            log_file: None,
        }
    }
}

impl SimulatorConfig {
    /// Load a configuration from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Save the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Parse)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Duration of one scheduler interval (`1 / action_frequency`).
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.dt())
    }

    /// Simulated time step in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / f64::from(self.action_frequency.max(1))
    }
}

/// An error raised while loading or saving a [`SimulatorConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The JSON document is malformed or has the wrong shape.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Cannot access configuration '{}': {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}
