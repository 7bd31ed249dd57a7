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

//! Render-surface contract.
//!
//! The simulator draws the scene with a handful of world-space primitives and
//! never touches pixels itself. A [`RenderSurface`] maps world coordinates to
//! the screen through its camera ([`Viewport`]) and can save what it drew to a
//! file, which is how recordings are exported.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::math::Vec2;
use crate::terrain::BezierSegment;

/// Camera position (world meters) and zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// World x at the centre of the view.
    pub x: f64,
    /// World y at the centre of the view.
    pub y: f64,
    /// Zoom multiplier applied on top of [`Viewport::PIXELS_PER_METER`].
    pub zoom: f64,
}

impl CameraPose {
    /// Creates a new camera pose.
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Color {
    /// Creates a colour from its channels.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// A coloured vertical stripe drawn behind the scene, used as a position marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Centre of the stripe.
    pub x: f64,
    /// Width of the stripe.
    pub width: f64,
    /// Stripe colour.
    pub color: Color,
}

/// The fixed palette of the scene; surfaces decide the actual colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brush {
    /// Sky.
    Background,
    /// Ground fill.
    Floor,
    /// Cart body and pole hinge.
    Cart,
    /// Wheel tyres.
    Tire,
    /// Wheel hubs.
    Wheel,
    /// The pole.
    Pole,
    /// The ball at the top of the pole.
    PoleBall,
    /// An explicit colour.
    Custom(Color),
}

/// World-to-screen mapping for a surface of a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Surface width in pixels.
    pub width: f64,
    /// Surface height in pixels.
    pub height: f64,
    /// The camera looking at the world.
    pub camera: CameraPose,
}

impl Viewport {
    /// Screen pixels per world meter at zoom 1.
    pub const PIXELS_PER_METER: f64 = 100.0;

    /// Creates a viewport.
    pub fn new(width: f64, height: f64, camera: CameraPose) -> Self {
        Self {
            width,
            height,
            camera,
        }
    }

    #[inline]
    fn scale(&self) -> f64 {
        self.camera.zoom * Self::PIXELS_PER_METER
    }

    /// World point to screen pixel (y pointing down).
    #[inline]
    pub fn world_to_screen(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.width / 2.0 + (p.x - self.camera.x) * self.scale(),
            self.height / 2.0 - (p.y - self.camera.y) * self.scale(),
        )
    }

    /// Screen pixel to world point.
    #[inline]
    pub fn screen_to_world(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            (p.x - self.width / 2.0) / self.scale() + self.camera.x,
            (self.height / 2.0 - p.y) / self.scale() + self.camera.y,
        )
    }

    /// World length to pixels.
    #[inline]
    pub fn world_to_screen_length(&self, m: f64) -> f64 {
        m * self.scale()
    }
}

/// Anything the scene can be painted on.
pub trait RenderSurface {
    /// The current world-to-screen mapping.
    fn viewport(&self) -> Viewport;

    /// Moves the camera.
    fn set_camera(&mut self, camera: CameraPose);

    /// Starts a new picture.
    fn begin_draw(&mut self);

    /// Finishes the picture.
    fn end_draw(&mut self);

    /// Clears the whole surface with the background brush.
    fn fill_background(&mut self);

    /// Filled circle.
    fn circle(&mut self, center: Vec2, radius: f64, brush: Brush);

    /// Filled polygon.
    fn polygon(&mut self, points: &[Vec2], brush: Brush);

    /// Fills the area enclosed by a chain of quadratic Bezier segments starting at `start`.
    fn bezier_fill(&mut self, start: Vec2, segments: &[BezierSegment], brush: Brush);

    /// Fills the world rectangle between `left` and `right`, from `top` down to
    /// the bottom of the surface.
    fn ground(&mut self, left: f64, right: f64, top: f64, brush: Brush);

    /// Vertical stripe centred on `x`, spanning the whole surface height.
    fn stripe(&mut self, x: f64, width: f64, color: Color);

    /// Writes the current picture to `path`.
    fn save_to_file(&mut self, path: &Path) -> Result<(), RenderError>;
}

/// Creates offline surfaces, e.g. for exporting recordings.
pub trait SurfaceFactory {
    /// Creates a surface of `width × height` pixels.
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn RenderSurface>, RenderError>;
}

/// An error raised by a render surface.
#[derive(Debug)]
pub enum RenderError {
    /// The requested surface size cannot be allocated.
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The picture could not be written.
    SaveFailed {
        /// Destination file.
        path: PathBuf,
        /// Backend-specific reason.
        reason: String,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidSize { width, height } => {
                write!(f, "Invalid surface size {width}x{height}")
            }
            RenderError::SaveFailed { path, reason } => {
                write!(f, "Failed to save '{}': {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for RenderError {}
