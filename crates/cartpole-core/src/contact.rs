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

//! # Contact Solver
//!
//! Finds where the two wheels of a cart touch the terrain. Starting from the
//! ground point under the cart centre, two independent bisection searches look
//! for the terrain points at exactly the wheelbase radius ahead and behind.
//! The tilt of the line joining them is the cart body angle, and the height of
//! its midpoint gives the vertical correction that puts both wheels on the
//! curve whatever the local slope.

use crate::math::Vec2;
use crate::terrain::Terrain;

/// Upper bound on bisection steps. The bracket halves every step, so this is
/// only reached on degenerate profiles where the tolerance can never be met.
pub const MAX_BISECTION_STEPS: u32 = 64;

/// Result of a contact alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Cart body tilt in radians.
    pub tilt: f64,
    /// Vertical correction added to the ground height under the centre.
    pub offset: f64,
    /// Ground point under the front wheel.
    pub front: Vec2,
    /// Ground point under the rear wheel.
    pub rear: Vec2,
}

/// Aligns a cart centred at `x` with wheels `radius` meters from its centre.
///
/// Each search stops once `|distance - radius| < tolerance`, or after
/// [`MAX_BISECTION_STEPS`] halvings.
pub fn align(terrain: &Terrain, x: f64, radius: f64, tolerance: f64) -> Contact {
    let center = Vec2::new(x, terrain.height(x));
    if radius <= 0.0 {
        return Contact {
            tilt: 0.0,
            offset: 0.0,
            front: center,
            rear: center,
        };
    }

    let front = find_point_at_distance(terrain, center, x + radius, radius, tolerance);
    let rear = find_point_at_distance(terrain, center, x - radius, radius, tolerance);

    Contact {
        tilt: (front.y - rear.y).atan2(front.x - rear.x),
        offset: (front.y + rear.y) / 2.0 - center.y,
        front,
        rear,
    }
}

/// Bisects the horizontal bracket `[center.x, far]` for the ground point whose
/// Euclidean distance from `center` equals `radius`.
fn find_point_at_distance(
    terrain: &Terrain,
    center: Vec2,
    far: f64,
    radius: f64,
    tolerance: f64,
) -> Vec2 {
    let mut near = center.x;
    let mut far = far;
    let mut point = Vec2::new(far, terrain.height(far));

    for _ in 0..MAX_BISECTION_STEPS {
        let mid = (near + far) / 2.0;
        point = Vec2::new(mid, terrain.height(mid));
        let distance = point.distance(center);
        if (distance - radius).abs() < tolerance {
            return point;
        }
        if distance < radius {
            near = mid;
        } else {
            far = mid;
        }
    }

    log::trace!(
        "Contact search around x={} did not reach tolerance {tolerance}",
        center.x
    );
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Crater;
    use approx::assert_abs_diff_eq;

    const RADIUS: f64 = 0.3;
    const TOLERANCE: f64 = 0.01;

    #[test]
    fn flat_ground_gives_level_cart() {
        let terrain = Terrain::flat();
        let contact = align(&terrain, 12.0, RADIUS, TOLERANCE);
        assert_abs_diff_eq!(contact.tilt, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(contact.offset, 0.0, epsilon = 1e-12);
        assert!((contact.front.x - 12.3).abs() < TOLERANCE);
        assert!((contact.rear.x - 11.7).abs() < TOLERANCE);
    }

    #[test]
    fn wheels_rest_on_the_crater_slope() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let mut x = -11.5;
        while x < -0.5 {
            let contact = align(&terrain, x, RADIUS, TOLERANCE);
            let center = Vec2::new(x, terrain.height(x));

            assert_abs_diff_eq!(contact.front.y, terrain.height(contact.front.x), epsilon = 1e-12);
            assert_abs_diff_eq!(contact.rear.y, terrain.height(contact.rear.x), epsilon = 1e-12);
            assert!((contact.front.distance(center) - RADIUS).abs() < TOLERANCE);
            assert!((contact.rear.distance(center) - RADIUS).abs() < TOLERANCE);
            assert!(contact.front.x > x && contact.rear.x < x);
            assert_abs_diff_eq!(
                center.y + contact.offset,
                (contact.front.y + contact.rear.y) / 2.0,
                epsilon = 1e-12
            );
            x += 0.25;
        }
    }

    #[test]
    fn descending_slope_tilts_forward_down() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let contact = align(&terrain, -8.5, RADIUS, TOLERANCE);
        assert!(contact.tilt < 0.0);
        let contact = align(&terrain, -3.5, RADIUS, TOLERANCE);
        assert!(contact.tilt > 0.0);
    }

    #[test]
    fn zero_radius_is_flat_contact() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let contact = align(&terrain, -8.0, 0.0, TOLERANCE);
        assert_eq!(contact.tilt, 0.0);
        assert_eq!(contact.offset, 0.0);
    }

    #[test]
    fn impossible_tolerance_terminates() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let contact = align(&terrain, -8.0, RADIUS, 0.0);
        assert!(contact.tilt.is_finite());
        assert!((contact.front.distance(Vec2::new(-8.0, terrain.height(-8.0))) - RADIUS).abs() < 1e-6);
    }
}
