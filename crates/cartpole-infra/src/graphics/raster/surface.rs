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
use std::path::Path;

use cartpole_core::math::Vec2;
use cartpole_core::renderer::{
    Brush, CameraPose, Color, RenderError, RenderSurface, SurfaceFactory, Viewport,
};
use cartpole_core::terrain::BezierSegment;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::rect::Rect;

use super::conversions::{close_outline, flatten, to_pixel, IntoRaster};

/// Largest side, in pixels, an offline surface may have.
const MAX_SIDE: u32 = 16_384;

/// The colours the raster surface resolves [`Brush`]es to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    /// Sky.
    pub background: Color,
    /// Ground.
    pub floor: Color,
    /// Cart body and hinge.
    pub cart: Color,
    /// Tyres.
    pub tire: Color,
    /// Wheel hubs.
    pub wheel: Color,
    /// Pole.
    pub pole: Color,
    /// Ball on top of the pole.
    pub pole_ball: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x40, 0x80, 0x80),
            floor: Color::rgb(0x11, 0x11, 0x11),
            cart: Color::rgb(0x80, 0x00, 0x00),
            tire: Color::rgb(0x00, 0x00, 0x00),
            wheel: Color::rgb(0x40, 0x20, 0x20),
            pole: Color::rgb(0x40, 0x20, 0x20),
            pole_ball: Color::rgb(0x00, 0x00, 0x00),
        }
    }
}

impl Palette {
    /// Resolves a brush to its colour.
    pub fn color(&self, brush: Brush) -> Color {
        match brush {
            Brush::Background => self.background,
            Brush::Floor => self.floor,
            Brush::Cart => self.cart,
            Brush::Tire => self.tire,
            Brush::Wheel => self.wheel,
            Brush::Pole => self.pole,
            Brush::PoleBall => self.pole_ball,
            Brush::Custom(color) => color,
        }
    }
}

/// An in-memory RGBA surface.
///
/// Every primitive is rasterized immediately, so [`RenderSurface::begin_draw`] and
/// [`RenderSurface::end_draw`] only bracket a picture for diagnostics.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: RgbaImage,
    camera: CameraPose,
    palette: Palette,
    drawing: bool,
}

impl ImageSurface {
    /// Allocates a `width × height` surface with the default palette.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Self::with_palette(width, height, Palette::default())
    }

    /// Allocates a surface with a custom palette.
    pub fn with_palette(width: u32, height: u32, palette: Palette) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            camera: CameraPose::default(),
            palette,
            drawing: false,
        })
    }

    /// The pixels drawn so far.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Colour of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image
            .get_pixel_checked(x, y)
            .map(|Rgba([r, g, b, _])| Color::rgb(*r, *g, *b))
    }

    fn rgba(&self, brush: Brush) -> Rgba<u8> {
        self.palette.color(brush).into_raster()
    }

    /// Fills the screen rectangle spanned by two corners, clipped to the surface.
    fn fill_screen_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let left = to_pixel(x0.min(x1)).max(0);
        let right = to_pixel(x0.max(x1)).min(w);
        let top = to_pixel(y0.min(y1)).max(0);
        let bottom = to_pixel(y0.max(y1)).min(h);
        if right <= left || bottom <= top {
            return;
        }
        let rect = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
        draw_filled_rect_mut(&mut self.image, rect, color);
    }

    fn fill_outline(&mut self, world: impl IntoIterator<Item = Vec2>, color: Rgba<u8>) {
        let viewport = self.viewport();
        let screen = world
            .into_iter()
            .map(|p| viewport.world_to_screen(p).into_raster());
        match close_outline(screen) {
            Some(outline) => draw_polygon_mut(&mut self.image, &outline, color),
            None => log::trace!("Skipping degenerate polygon"),
        }
    }
}

impl RenderSurface for ImageSurface {
    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.image.width() as f64,
            self.image.height() as f64,
            self.camera,
        )
    }

    fn set_camera(&mut self, camera: CameraPose) {
        self.camera = camera;
    }

    fn begin_draw(&mut self) {
        if self.drawing {
            log::warn!("begin_draw called twice without end_draw");
        }
        self.drawing = true;
    }

    fn end_draw(&mut self) {
        self.drawing = false;
    }

    fn fill_background(&mut self) {
        let color = self.rgba(Brush::Background);
        self.image.pixels_mut().for_each(|p| *p = color);
    }

    fn circle(&mut self, center: Vec2, radius: f64, brush: Brush) {
        let viewport = self.viewport();
        let c = viewport.world_to_screen(center);
        let r = to_pixel(viewport.world_to_screen_length(radius)).max(1);
        let color = self.rgba(brush);
        draw_filled_circle_mut(&mut self.image, (to_pixel(c.x), to_pixel(c.y)), r, color);
    }

    fn polygon(&mut self, points: &[Vec2], brush: Brush) {
        let color = self.rgba(brush);
        self.fill_outline(points.iter().copied(), color);
    }

    fn bezier_fill(&mut self, start: Vec2, segments: &[BezierSegment], brush: Brush) {
        let color = self.rgba(brush);
        self.fill_outline(flatten(start, segments), color);
    }

    fn ground(&mut self, left: f64, right: f64, top: f64, brush: Brush) {
        let viewport = self.viewport();
        let a = viewport.world_to_screen(Vec2::new(left, top));
        let b = viewport.world_to_screen(Vec2::new(right, top));
        let color = self.rgba(brush);
        self.fill_screen_rect(a.x, a.y, b.x, viewport.height, color);
    }

    fn stripe(&mut self, x: f64, width: f64, color: Color) {
        let viewport = self.viewport();
        let a = viewport.world_to_screen(Vec2::new(x - width / 2.0, 0.0));
        let b = viewport.world_to_screen(Vec2::new(x + width / 2.0, 0.0));
        self.fill_screen_rect(a.x, 0.0, b.x, viewport.height, color.into_raster());
    }

    fn save_to_file(&mut self, path: &Path) -> Result<(), RenderError> {
        self.image
            .save(path)
            .map_err(|e| RenderError::SaveFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

/// Creates [`ImageSurface`]s sharing one palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSurfaceFactory {
    palette: Palette,
}

impl ImageSurfaceFactory {
    /// A factory using `palette` for every surface it creates.
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

impl SurfaceFactory for ImageSurfaceFactory {
    fn create(&self, width: u32, height: u32) -> Result<Box<dyn RenderSurface>, RenderError> {
        let surface = ImageSurface::with_palette(width, height, self.palette)?;
        Ok(Box::new(surface))
    }
}
