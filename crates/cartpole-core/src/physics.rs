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

//! # Cart-Pole Physics
//!
//! Closed-form dynamics of a cart carrying a single inverted pole, rolling on
//! a tilted surface. Each tick computes the pole and cart accelerations from
//! the coupled Lagrangian equations, integrates with semi-implicit Euler
//! (velocities first, then positions), keeps the pole angle in `[-π, π)`,
//! enforces the world boundary and finally re-seats the cart on the terrain.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::config::{ObjectParameters, SimulatorConfig};
use crate::contact;
use crate::math::Vec2;
use crate::terrain::Terrain;

/// The state a simulation (re)starts from. `y` and `phi` are derived from the terrain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialState {
    /// Horizontal position.
    pub x: f64,
    /// Horizontal velocity.
    pub dx: f64,
    /// Horizontal acceleration.
    pub ddx: f64,
    /// Pole angle, relative to the cart's vertical.
    pub theta: f64,
    /// Pole angular velocity.
    pub dtheta: f64,
    /// Pole angular acceleration.
    pub ddtheta: f64,
}

/// A snapshot of the full kinematic state of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartState {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position, derived from the terrain.
    pub y: f64,
    /// Horizontal velocity.
    pub dx: f64,
    /// Horizontal acceleration.
    pub ddx: f64,
    /// Pole angle in `[-π, π)`.
    pub theta: f64,
    /// Pole angular velocity.
    pub dtheta: f64,
    /// Pole angular acceleration.
    pub ddtheta: f64,
    /// Cart body tilt, derived from the terrain.
    pub phi: f64,
}

/// Physical constants of one cart-pole system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartParameters {
    /// Gravitational acceleration.
    pub gravity: f64,
    /// Cart size, mass and damping.
    pub cart: ObjectParameters,
    /// Pole length, mass and damping.
    pub pole: ObjectParameters,
    /// Tolerance used when aligning the wheels with the terrain.
    pub contact_tolerance: f64,
}

impl From<&SimulatorConfig> for CartParameters {
    fn from(config: &SimulatorConfig) -> Self {
        Self {
            gravity: config.gravity,
            cart: config.cart,
            pole: config.pole,
            contact_tolerance: config.contact_tolerance,
        }
    }
}

impl CartParameters {
    /// Width of the cart body.
    #[inline]
    pub fn width(&self) -> f64 {
        self.cart.size
    }

    /// Distance between the two wheel axles.
    #[inline]
    pub fn wheel_distance(&self) -> f64 {
        3.0 * self.cart.size / 5.0
    }

    /// Height of the cart body.
    #[inline]
    pub fn body_height(&self) -> f64 {
        self.cart.size / 6.0
    }

    /// Wheel radius.
    #[inline]
    pub fn wheel_radius(&self) -> f64 {
        self.cart.size / 10.0
    }

    /// The interval the cart centre is confined to.
    pub fn bounds(&self) -> (f64, f64) {
        let half = self.width() / 2.0;
        (Terrain::MIN_X + half, Terrain::MAX_X - half)
    }
}

/// The simulated cart with its pole.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    /// Current kinematic state.
    pub state: CartState,
    /// When set, [`Cart::tick`] leaves the state untouched.
    pub frozen: bool,
    params: CartParameters,
}

impl Cart {
    /// Creates a cart at rest at `x = 0`. Call [`Cart::reset`] to place it on a terrain.
    pub fn new(params: CartParameters) -> Self {
        Self {
            state: CartState::default(),
            frozen: false,
            params,
        }
    }

    /// The physical constants of this cart.
    pub fn params(&self) -> &CartParameters {
        &self.params
    }

    /// Replaces the physical constants, keeping the current state.
    pub fn set_params(&mut self, params: CartParameters) {
        self.params = params;
    }

    /// Restarts from `initial`, unfreezes and seats the cart on `terrain`.
    pub fn reset(&mut self, initial: &InitialState, terrain: &Terrain) {
        self.state = CartState {
            x: initial.x,
            y: 0.0,
            dx: initial.dx,
            ddx: initial.ddx,
            theta: wrap_angle(initial.theta),
            dtheta: initial.dtheta,
            ddtheta: initial.ddtheta,
            phi: 0.0,
        };
        self.frozen = false;
        self.align(terrain);
    }

    /// Recomputes `y` and `phi` from the terrain under the current `x`.
    pub fn align(&mut self, terrain: &Terrain) {
        let contact = contact::align(
            terrain,
            self.state.x,
            self.params.wheel_distance() / 2.0,
            self.params.contact_tolerance,
        );
        self.state.phi = contact.tilt;
        self.state.y = terrain.height(self.state.x) + contact.offset;
    }

    /// Advances the system by `dt` seconds under the horizontal `force`.
    ///
    /// Does nothing while frozen. Past the world boundary the cart is clamped
    /// back and bounces; it is then re-aligned with the terrain.
    pub fn tick(&mut self, force: f64, dt: f64, terrain: &Terrain) {
        if self.frozen {
            return;
        }

        let CartParameters {
            gravity: g,
            cart,
            pole,
            ..
        } = self.params;
        let s = &mut self.state;

        let mass = cart.mass + pole.mass;
        let (sin_t, cos_t) = s.theta.sin_cos();
        let sin_p = s.phi.sin();
        let ml = pole.mass * pole.size;
        let dtheta2 = s.dtheta * s.dtheta;

        s.ddtheta = (mass * g * (s.theta - s.phi).sin()
            - cos_t * (force + ml * dtheta2 * sin_t - mass * g * sin_p))
            / (mass * pole.size - ml * cos_t * cos_t)
            - pole.damping * s.dtheta;

        s.ddx = (force + ml * (dtheta2 * sin_t - s.ddtheta * cos_t)) / mass
            - g * sin_p
            - cart.damping * s.dx;

        s.dx += s.ddx * dt;
        s.dtheta += s.ddtheta * dt;
        s.theta = wrap_angle(s.theta + s.dtheta * dt);
        s.x += s.dx * dt * s.phi.cos();

        let (left, right) = self.params.bounds();
        if s.x < left || s.x > right {
            s.x = s.x.clamp(left, right);
            self.bounce();
        }

        self.align(terrain);
    }

    /// Inelastic bounce: halves and reverses the horizontal velocity.
    pub fn bounce(&mut self) {
        self.state.dx = -self.state.dx * 0.5;
        self.state.ddx = 0.0;
    }

    /// Zeroes every velocity and acceleration.
    pub fn drop_momentum(&mut self) {
        self.state.dx = 0.0;
        self.state.ddx = 0.0;
        self.state.dtheta = 0.0;
        self.state.ddtheta = 0.0;
    }

    /// Slides the cart along the terrain (drag interaction) and re-seats it.
    /// The height follows from the ground under the new position.
    pub fn move_by(&mut self, dx: f64, terrain: &Terrain) {
        let (left, right) = self.params.bounds();
        self.state.x = (self.state.x + dx).clamp(left, right);
        self.align(terrain);
    }

    /// Whether the world point `(x, y)` lies inside the cart body.
    pub fn is_touched(&self, x: f64, y: f64) -> bool {
        let width = self.params.width();
        let height = self.params.body_height();
        let lift = self.params.wheel_radius() + height / 2.0;
        let phi = self.state.phi;

        let center = Vec2::new(self.state.x, self.state.y) + Vec2::new(0.0, lift).rotate(phi);
        let local = (Vec2::new(x, y) - center).rotate(-phi);

        local.x.abs() <= width / 2.0 && local.y.abs() <= height / 2.0
    }
}

/// Wraps an angle into `[-π, π)`.
///
/// Per tick the angle moves by far less than a turn, so the loops run at most
/// once; larger jumps (arbitrary initial states) take the modulo path.
pub fn wrap_angle(mut theta: f64) -> f64 {
    if theta.abs() > 4.0 * TAU {
        return (theta + PI).rem_euclid(TAU) - PI;
    }
    while theta < -PI {
        theta += TAU;
    }
    while theta >= PI {
        theta -= TAU;
    }
    theta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Crater;
    use approx::assert_abs_diff_eq;

    const DT: f64 = 0.02;

    fn cart_on(terrain: &Terrain, initial: InitialState) -> Cart {
        let mut cart = Cart::new(CartParameters::from(&SimulatorConfig::default()));
        cart.reset(&initial, terrain);
        cart
    }

    #[test]
    fn upright_pole_at_rest_stays_put() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(&terrain, InitialState::default());
        for _ in 0..100 {
            cart.tick(0.0, DT, &terrain);
        }
        assert_eq!(cart.state.x, 0.0);
        assert_eq!(cart.state.theta, 0.0);
    }

    #[test]
    fn tilted_pole_falls_over() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(
            &terrain,
            InitialState {
                theta: 0.1,
                ..Default::default()
            },
        );
        cart.tick(0.0, DT, &terrain);
        assert!(cart.state.ddtheta > 0.0);
        assert!(cart.state.dtheta > 0.0);
        assert!(cart.state.theta > 0.1);
    }

    #[test]
    fn pushing_right_accelerates_right() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(&terrain, InitialState::default());
        cart.tick(10.0, DT, &terrain);
        assert!(cart.state.ddx > 0.0);
        assert!(cart.state.dx > 0.0);
        assert!(cart.state.x > 0.0);
        // The base moving right tips the pole back.
        assert!(cart.state.ddtheta < 0.0);
    }

    #[test]
    fn integration_is_deterministic() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let initial = InitialState {
            x: -9.0,
            theta: 0.3,
            ..Default::default()
        };
        let forces: Vec<f64> = (0..500).map(|i| ((i * 37) % 21) as f64 - 10.0).collect();

        let run = || {
            let mut cart = cart_on(&terrain, initial);
            for f in &forces {
                cart.tick(*f, DT, &terrain);
            }
            cart.state
        };
        let a = run();
        let b = run();
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.theta.to_bits(), b.theta.to_bits());
        assert_eq!(a.dtheta.to_bits(), b.dtheta.to_bits());
        assert_eq!(a.phi.to_bits(), b.phi.to_bits());
    }

    #[test]
    fn theta_stays_wrapped_while_spinning() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(
            &terrain,
            InitialState {
                theta: 3.0,
                dtheta: 40.0,
                ..Default::default()
            },
        );
        for i in 0..2000 {
            let force = if i % 7 < 3 { 50.0 } else { -50.0 };
            cart.tick(force, DT, &terrain);
            assert!(
                (-PI..PI).contains(&cart.state.theta),
                "theta {} escaped at tick {i}",
                cart.state.theta
            );
        }
    }

    #[test]
    fn boundary_clamps_and_bounces() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(
            &terrain,
            InitialState {
                x: 99.0,
                dx: 5.0,
                ..Default::default()
            },
        );
        let (_, right) = cart.params().bounds();
        assert_eq!(right, 99.5);

        let mut bounced = false;
        for _ in 0..200 {
            cart.tick(100.0, DT, &terrain);
            assert!(cart.state.x <= right);
            if cart.state.x == right {
                assert!(cart.state.dx <= 0.0);
                assert_eq!(cart.state.ddx, 0.0);
                bounced = true;
                break;
            }
        }
        assert!(bounced);
    }

    #[test]
    fn bounce_and_drop_momentum_are_idempotent() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(
            &terrain,
            InitialState {
                dx: 4.0,
                dtheta: 1.0,
                ..Default::default()
            },
        );
        cart.bounce();
        assert_eq!(cart.state.dx, -2.0);
        cart.drop_momentum();
        cart.drop_momentum();
        assert_eq!(cart.state.dx, 0.0);
        assert_eq!(cart.state.dtheta, 0.0);
        cart.bounce();
        assert_eq!(cart.state.dx, 0.0);
    }

    #[test]
    fn frozen_cart_ignores_ticks() {
        let terrain = Terrain::flat();
        let mut cart = cart_on(
            &terrain,
            InitialState {
                theta: 0.5,
                ..Default::default()
            },
        );
        cart.frozen = true;
        let before = cart.state;
        cart.tick(10.0, DT, &terrain);
        assert_eq!(cart.state, before);
    }

    #[test]
    fn cart_follows_terrain_into_crater() {
        let terrain = Terrain::build(&[Crater::new(-6.0, 10.0, 1.5)]);
        let mut cart = cart_on(
            &terrain,
            InitialState {
                x: -8.0,
                ..Default::default()
            },
        );
        assert!(cart.state.phi < 0.0);
        assert!(cart.state.y < 0.0);

        cart.move_by(2.0, &terrain);
        assert_abs_diff_eq!(cart.state.x, -6.0, epsilon = 1e-12);
        let expected = contact::align(&terrain, -6.0, 0.3, 0.01);
        assert_abs_diff_eq!(cart.state.y, terrain.height(-6.0) + expected.offset, epsilon = 1e-12);
        assert_abs_diff_eq!(cart.state.phi, expected.tilt, epsilon = 1e-12);
    }

    #[test]
    fn hit_test_covers_the_body_only() {
        let terrain = Terrain::flat();
        let cart = cart_on(&terrain, InitialState::default());
        // Body spans x in [-0.5, 0.5], y in [0.1, 0.1 + 1/6].
        assert!(cart.is_touched(0.0, 0.15));
        assert!(cart.is_touched(0.45, 0.2));
        assert!(!cart.is_touched(0.0, 0.05));
        assert!(!cart.is_touched(0.6, 0.15));
        assert!(!cart.is_touched(0.0, 0.9));
    }

    #[test]
    fn wrap_angle_range() {
        assert_eq!(wrap_angle(PI), -PI);
        assert_eq!(wrap_angle(-PI), -PI);
        assert_abs_diff_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        let far = wrap_angle(1000.0);
        assert!((-PI..PI).contains(&far));
        assert_abs_diff_eq!(far.sin(), 1000.0_f64.sin(), epsilon = 1e-9);
    }
}
