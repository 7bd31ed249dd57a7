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

//! # Terrain Model
//!
//! The ground is an ordered chain of quadratic Bezier segments. Each segment
//! starts where the previous one ended, so a segment only stores its control
//! point and its end point. The chain covers the world domain
//! `[MIN_X, MAX_X]` and is closed by two vertical drops at the boundaries.
//!
//! Craters are spliced in once, when the terrain is built, and the model is
//! immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// A terrain depression centred at `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crater {
    /// Horizontal position of the crater centre.
    pub x: f64,
    /// Total width of the crater.
    pub width: f64,
    /// Depth below flat ground. Negative values produce a hill.
    pub depth: f64,
}

impl Crater {
    /// Creates a new crater description.
    pub const fn new(x: f64, width: f64, depth: f64) -> Self {
        Self { x, width, depth }
    }

    /// Left edge of the crater.
    #[inline]
    pub fn left(&self) -> f64 {
        self.x - self.width / 2.0
    }

    /// Right edge of the crater.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// A crater is accepted only if it fits in `[min, max]`, is at least six
    /// times as wide as it is deep, and is less than 10 m deep.
    pub fn fits(&self, min: f64, max: f64) -> bool {
        self.left() >= min
            && self.right() <= max
            && self.width >= 6.0 * self.depth.abs()
            && self.depth.abs() < 10.0
    }
}

/// One quadratic Bezier segment. Its start point is the end of the previous segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierSegment {
    /// The control point.
    pub control: Vec2,
    /// The end point.
    pub end: Vec2,
}

impl BezierSegment {
    /// Creates a new segment.
    pub const fn new(control: Vec2, end: Vec2) -> Self {
        Self { control, end }
    }

    /// Evaluates the curve at parameter `t` for a segment starting at `start`.
    pub fn point_at(&self, start: Vec2, t: f64) -> Vec2 {
        let u = 1.0 - t;
        Vec2::new(
            u * u * start.x + 2.0 * u * t * self.control.x + t * t * self.end.x,
            u * u * start.y + 2.0 * u * t * self.control.y + t * t * self.end.y,
        )
    }

    /// Solves `B(t).x = x` for `t` in `[0, 1]` and returns `B(t).y`.
    ///
    /// When both roots are valid the first (`(-b + √d) / 2a`) wins. A segment
    /// whose x-polynomial degenerates to a line is solved linearly, and a
    /// vertical segment never matches.
    pub fn height_at(&self, start: Vec2, x: f64) -> Option<f64> {
        let a = start.x - 2.0 * self.control.x + self.end.x;
        let b = 2.0 * self.control.x - 2.0 * start.x;
        let c = start.x - x;

        let valid = |t: f64| (0.0..=1.0).contains(&t);

        let t = if a.abs() < LINEAR_EPSILON {
            if b.abs() < LINEAR_EPSILON {
                return None;
            }
            Some(-c / b).filter(|t| valid(*t))?
        } else {
            let d = b * b - 4.0 * a * c;
            if d < 0.0 {
                return None;
            }
            let d = d.sqrt();
            let t1 = (-b + d) / (2.0 * a);
            let t2 = (-b - d) / (2.0 * a);
            if valid(t1) {
                t1
            } else if valid(t2) {
                t2
            } else {
                return None;
            }
        };

        Some(self.point_at(start, t).y)
    }
}

const LINEAR_EPSILON: f64 = 1e-12;

/// The immutable ground profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    start: Vec2,
    segments: Vec<BezierSegment>,
}

impl Terrain {
    /// Left edge of the world.
    pub const MIN_X: f64 = -100.0;
    /// Right edge of the world.
    pub const MAX_X: f64 = 100.0;
    /// Height the boundary drops fall to.
    pub const BOTTOM: f64 = -11.0;

    /// A terrain without craters.
    pub fn flat() -> Self {
        Self::build(&[])
    }

    /// Builds the terrain, splicing in every crater that fits the remaining
    /// domain. Craters are consumed left to right; a rejected crater is skipped
    /// and does not move the left bound for the next one.
    pub fn build(craters: &[Crater]) -> Self {
        let start = Vec2::new(Self::MIN_X, Self::BOTTOM);
        let mut segments = vec![BezierSegment::new(
            Vec2::new(Self::MIN_X, 0.0),
            Vec2::new(Self::MIN_X, 0.0),
        )];

        let mut min = Self::MIN_X;
        for crater in craters {
            if !crater.fits(min, Self::MAX_X) {
                log::warn!(
                    "Skipping crater at x={} (width {}, depth {}): it does not fit the terrain",
                    crater.x,
                    crater.width,
                    crater.depth
                );
                continue;
            }
            splice_crater(&mut segments, crater);
            min = crater.right();
        }

        segments.push(BezierSegment::new(
            Vec2::new(Self::MAX_X, 0.0),
            Vec2::new(Self::MAX_X, 0.0),
        ));
        segments.push(BezierSegment::new(
            Vec2::new(Self::MAX_X, Self::BOTTOM),
            Vec2::new(Self::MAX_X, Self::BOTTOM),
        ));

        log::debug!("Terrain built with {} segments", segments.len());
        Self { start, segments }
    }

    /// The point the first segment starts from.
    pub fn start(&self) -> Vec2 {
        self.start
    }

    /// The contiguous segment chain, boundary drops included.
    pub fn segments(&self) -> &[BezierSegment] {
        &self.segments
    }

    /// Iterates over `(start, segment)` pairs.
    pub fn pieces(&self) -> impl Iterator<Item = (Vec2, &BezierSegment)> + '_ {
        std::iter::once(self.start)
            .chain(self.segments.iter().map(|s| s.end))
            .zip(self.segments.iter())
    }

    /// Ground height at `x`.
    ///
    /// Segments are scanned in order and the first one containing `x` answers.
    /// The closing right-hand drop is never queried. When no segment yields a
    /// root (e.g. `x` outside the world) the height is `0`, extending the flat
    /// ground.
    pub fn height(&self, x: f64) -> f64 {
        let queried = self.segments.len().saturating_sub(1);
        self.pieces()
            .take(queried)
            .find_map(|(start, segment)| segment.height_at(start, x))
            .unwrap_or(0.0)
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Self::flat()
    }
}

/// Appends the five segments shaping one crater: a flat run to its left edge,
/// an eased slope down to half depth, the bottom, and the mirrored slope back up.
fn splice_crater(segments: &mut Vec<BezierSegment>, crater: &Crater) {
    let (left, right, w, depth) = (crater.left(), crater.right(), crater.width, crater.depth);
    let p = Vec2::new;
    segments.extend_from_slice(&[
        BezierSegment::new(p(left, 0.0), p(left, 0.0)),
        BezierSegment::new(p(left + 0.1 * w, 0.0), p(left + 0.25 * w, -depth / 2.0)),
        BezierSegment::new(p(left + 0.4 * w, -depth), p(left + 0.5 * w, -depth)),
        BezierSegment::new(p(right - 0.4 * w, -depth), p(right - 0.25 * w, -depth / 2.0)),
        BezierSegment::new(p(right - 0.1 * w, 0.0), p(right, 0.0)),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn example_terrain() -> Terrain {
        Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)])
    }

    #[test]
    fn flat_terrain_is_zero_everywhere() {
        let terrain = Terrain::flat();
        let mut x = -100.0;
        while x <= 100.0 {
            assert_abs_diff_eq!(terrain.height(x), 0.0, epsilon = 1e-12);
            x += 0.37;
        }
    }

    #[test]
    fn segments_are_contiguous_and_closed() {
        let terrain = example_terrain();
        // Drop + 5 crater segments + flat run + drop.
        assert_eq!(terrain.segments().len(), 8);
        assert_eq!(terrain.start(), Vec2::new(-100.0, -11.0));
        let last = terrain.segments().last().unwrap();
        assert_eq!(last.end, Vec2::new(100.0, -11.0));
    }

    #[test]
    fn crater_dips_below_flat_ground() {
        let terrain = example_terrain();
        let bottom = terrain.height(-6.0);
        assert_abs_diff_eq!(bottom, -1.5, epsilon = 1e-9);
        assert!((bottom + 1.5).abs() < (terrain.height(-12.0) + 1.5).abs());
        assert!((bottom + 1.5).abs() < (terrain.height(0.0) + 1.5).abs());
        assert_abs_diff_eq!(terrain.height(-11.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(terrain.height(-1.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(terrain.height(50.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn crater_profile_is_continuous() {
        let terrain = example_terrain();
        let mut previous = terrain.height(-12.0);
        let mut x = -12.0;
        while x < 0.0 {
            x += 0.01;
            let h = terrain.height(x);
            assert!((h - previous).abs() < 0.05, "jump at x={x}: {previous} -> {h}");
            assert!(h <= 1e-9 && h >= -1.5 - 1e-9);
            previous = h;
        }
    }

    #[test]
    fn invalid_craters_are_skipped_without_consuming_domain() {
        let craters = [
            Crater::new(-6.0, 5.0, 1.5),   // too narrow for its depth
            Crater::new(-98.0, 10.0, 1.0), // sticks out of the world
            Crater::new(20.0, 200.0, 12.0),
            Crater::new(-6.0, 10.0, 1.5),
        ];
        let terrain = Terrain::build(&craters);
        assert_eq!(terrain, example_terrain());
    }

    #[test]
    fn overlapping_crater_is_rejected() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5), Crater::new(-4.0, 10.0, 1.0)]);
        assert_eq!(terrain, example_terrain());
    }

    #[test]
    fn negative_depth_makes_a_hill() {
        let terrain = Terrain::build(&[Crater::new(10.0, 12.0, -2.0)]);
        assert_abs_diff_eq!(terrain.height(10.0), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn out_of_domain_query_falls_back_to_zero() {
        let terrain = Terrain::build(&[Crater::new(-95.0, 10.0, 1.5)]);
        assert_eq!(terrain.height(-150.0), 0.0);
        assert_eq!(terrain.height(250.0), 0.0);
    }

    #[test]
    fn degenerate_segment_is_solved_linearly() {
        let segment = BezierSegment::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0));
        let y = segment.height_at(Vec2::new(0.0, 0.0), 0.5).unwrap();
        assert_abs_diff_eq!(y, 0.5, epsilon = 1e-12);

        let vertical = BezierSegment::new(Vec2::new(0.0, 1.0), Vec2::new(0.0, 2.0));
        assert_eq!(vertical.height_at(Vec2::new(0.0, 0.0), 0.0), None);
    }
}
