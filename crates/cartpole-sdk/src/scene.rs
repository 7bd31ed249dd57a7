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
//! Painting the world: scenery first, then the cart on top.

use std::f64::consts::FRAC_PI_2;

use cartpole_core::math::Vec2;
use cartpole_core::physics::{CartParameters, CartState};
use cartpole_core::renderer::{Brush, Marker, RenderSurface};
use cartpole_core::terrain::Terrain;

/// Top of the solid rectangle painted under the terrain curve.
const GROUND_TOP: f64 = -10.0;

/// Everything that does not move: the sky, the markers and the ground.
#[derive(Debug, Clone, Copy)]
pub struct Scenery<'a> {
    terrain: &'a Terrain,
    markers: &'a [Marker],
}

impl<'a> Scenery<'a> {
    /// Borrows the terrain and markers to paint.
    pub fn new(terrain: &'a Terrain, markers: &'a [Marker]) -> Self {
        Self { terrain, markers }
    }

    /// Clears the surface and paints the scenery with the surface's current camera.
    pub fn paint(&self, surface: &mut dyn RenderSurface) {
        surface.fill_background();

        for marker in self.markers.iter().filter(|m| m.width > 0.0) {
            surface.stripe(marker.x, marker.width, marker.color);
        }

        surface.bezier_fill(self.terrain.start(), self.terrain.segments(), Brush::Floor);
        surface.ground(Terrain::MIN_X, Terrain::MAX_X, GROUND_TOP, Brush::Floor);
    }
}

/// Paints a cart in the given state: pole, hinge and ball behind the body, then
/// both wheels.
pub fn paint_cart(surface: &mut dyn RenderSurface, state: &CartState, params: &CartParameters) {
    let half_width = params.width() / 2.0;
    let pole_half_width = params.width() / 40.0;
    let wheel = params.wheel_radius();
    let phi = state.phi;
    let pole_angle = phi - state.theta;

    let base = Vec2::new(state.x, state.y) + Vec2::from_angle(phi + FRAC_PI_2) * wheel;
    let along = Vec2::from_angle(phi);
    let up = Vec2::from_angle(phi + FRAC_PI_2) * params.body_height();
    let across_pole = Vec2::from_angle(pole_angle) * pole_half_width;
    let pole = Vec2::from_angle(pole_angle + FRAC_PI_2) * params.pole.size;

    let hinge = base + up;
    surface.polygon(
        &[
            hinge - across_pole,
            hinge + across_pole,
            hinge + across_pole + pole,
            hinge - across_pole + pole,
        ],
        Brush::Pole,
    );
    surface.circle(
        hinge - Vec2::new(0.0, pole_half_width),
        2.4 * pole_half_width,
        Brush::Cart,
    );
    surface.circle(hinge + pole, 3.0 * pole_half_width, Brush::PoleBall);

    let side = along * half_width;
    surface.polygon(
        &[base - side, base + side, base + side + up, base - side + up],
        Brush::Cart,
    );

    let axle = along * (params.wheel_distance() / 2.0);
    for center in [base + axle, base - axle] {
        surface.circle(center, wheel, Brush::Tire);
        surface.circle(center, wheel / 2.0, Brush::Wheel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cartpole_core::config::SimulatorConfig;
    use cartpole_core::renderer::{CameraPose, Color, RenderError, Viewport};
    use cartpole_core::terrain::BezierSegment;
    use std::path::Path;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Background,
        Stripe(f64),
        Bezier(usize),
        Ground(f64),
        Circle(Vec2, f64, Brush),
        Polygon(Vec<Vec2>, Brush),
    }

    #[derive(Default)]
    struct CallLog {
        calls: Vec<Call>,
    }

    impl RenderSurface for CallLog {
        fn viewport(&self) -> Viewport {
            Viewport::new(640.0, 360.0, CameraPose::default())
        }
        fn set_camera(&mut self, _camera: CameraPose) {}
        fn begin_draw(&mut self) {}
        fn end_draw(&mut self) {}
        fn fill_background(&mut self) {
            self.calls.push(Call::Background);
        }
        fn circle(&mut self, center: Vec2, radius: f64, brush: Brush) {
            self.calls.push(Call::Circle(center, radius, brush));
        }
        fn polygon(&mut self, points: &[Vec2], brush: Brush) {
            self.calls.push(Call::Polygon(points.to_vec(), brush));
        }
        fn bezier_fill(&mut self, _start: Vec2, segments: &[BezierSegment], _brush: Brush) {
            self.calls.push(Call::Bezier(segments.len()));
        }
        fn ground(&mut self, _left: f64, _right: f64, top: f64, _brush: Brush) {
            self.calls.push(Call::Ground(top));
        }
        fn stripe(&mut self, x: f64, _width: f64, _color: Color) {
            self.calls.push(Call::Stripe(x));
        }
        fn save_to_file(&mut self, _path: &Path) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[test]
    fn scenery_paints_back_to_front() {
        let terrain = Terrain::flat();
        let grey = Color::rgb(90, 90, 90);
        let markers = [
            Marker { x: -2.0, width: 0.1, color: grey },
            Marker { x: 5.0, width: 0.0, color: grey },
        ];
        let mut log = CallLog::default();
        Scenery::new(&terrain, &markers).paint(&mut log);

        assert_eq!(
            log.calls,
            vec![
                Call::Background,
                Call::Stripe(-2.0),
                Call::Bezier(terrain.segments().len()),
                Call::Ground(-10.0),
            ]
        );
    }

    #[test]
    fn upright_cart_has_ball_above_the_hinge() {
        let params = CartParameters::from(&SimulatorConfig::default());
        let state = CartState::default();
        let mut log = CallLog::default();
        paint_cart(&mut log, &state, &params);

        // Pole, hinge, ball, body and two wheels with hubs.
        assert_eq!(log.calls.len(), 8);
        let Call::Circle(ball, radius, Brush::PoleBall) = log.calls[2] else {
            panic!("expected the pole ball, got {:?}", log.calls[2]);
        };
        // Wheel radius 0.1, body height 1/6, pole length 1.
        assert_abs_diff_eq!(ball.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ball.y, 0.1 + 1.0 / 6.0 + 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(radius, 3.0 / 40.0, epsilon = 1e-12);
    }

    #[test]
    fn positive_theta_leans_the_pole_right() {
        let params = CartParameters::from(&SimulatorConfig::default());
        let state = CartState {
            theta: 0.3,
            ..CartState::default()
        };
        let mut log = CallLog::default();
        paint_cart(&mut log, &state, &params);

        let Call::Circle(ball, _, _) = log.calls[2] else {
            panic!("expected the pole ball");
        };
        assert_abs_diff_eq!(ball.x, 0.3f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn wheels_sit_on_the_tilted_axis() {
        let params = CartParameters::from(&SimulatorConfig::default());
        let state = CartState {
            phi: 0.2,
            ..CartState::default()
        };
        let mut log = CallLog::default();
        paint_cart(&mut log, &state, &params);

        let tires: Vec<Vec2> = log
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Circle(center, _, Brush::Tire) => Some(*center),
                _ => None,
            })
            .collect();
        assert_eq!(tires.len(), 2);
        let axis = tires[0] - tires[1];
        assert_abs_diff_eq!(axis.y.atan2(axis.x), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(axis.length(), params.wheel_distance(), epsilon = 1e-12);
    }
}
