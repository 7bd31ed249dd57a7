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
use cartpole_core::math::Vec2;
use cartpole_core::renderer::Color;
use cartpole_core::terrain::BezierSegment;
use image::Rgba;
use imageproc::point::Point;

/// Number of line pieces each quadratic segment is flattened into.
pub(crate) const BEZIER_STEPS: usize = 16;

/// A local extension trait converting our geometry into rasterizer types.
pub(crate) trait IntoRaster<T> {
    /// Consumes self and converts it.
    fn into_raster(self) -> T;
}

impl IntoRaster<Rgba<u8>> for Color {
    fn into_raster(self) -> Rgba<u8> {
        Rgba([self.red, self.green, self.blue, 255])
    }
}

impl IntoRaster<Point<i32>> for Vec2 {
    fn into_raster(self) -> Point<i32> {
        Point::new(to_pixel(self.x), to_pixel(self.y))
    }
}

/// Rounds a screen coordinate to the nearest pixel, saturating far outside the image.
#[inline]
pub(crate) fn to_pixel(v: f64) -> i32 {
    v.round().clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32
}

/// Turns a closed outline into a polygon `imageproc` accepts: consecutive
/// duplicates removed, the closing vertex dropped, at least three vertices.
pub(crate) fn close_outline(points: impl IntoIterator<Item = Point<i32>>) -> Option<Vec<Point<i32>>> {
    let mut outline: Vec<Point<i32>> = Vec::new();
    for p in points {
        if outline.last() != Some(&p) {
            outline.push(p);
        }
    }
    while outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }
    (outline.len() >= 3).then_some(outline)
}

/// Flattens a Bezier chain into world-space vertices, `start` included.
pub(crate) fn flatten(start: Vec2, segments: &[BezierSegment]) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(1 + segments.len() * BEZIER_STEPS);
    points.push(start);
    let mut from = start;
    for segment in segments {
        for step in 1..=BEZIER_STEPS {
            points.push(segment.point_at(from, step as f64 / BEZIER_STEPS as f64));
        }
        from = segment.end;
    }
    points
}
