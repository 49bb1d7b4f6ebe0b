//! # Differential drive simulator
//!
//! Integrates the motion of a two wheeled robot over fixed timesteps. Each
//! tick:
//!
//! 1. Wheel velocity commands are limited to the maximum velocity and then
//!    rate limited against the previous tick's velocities.
//! 2. Encoders integrate the limited velocities.
//! 3. The pose is moved exactly along the arc about the instantaneous centre
//!    of curvature (ICC), or straight if both wheels match.
//! 4. Sideways slip carries over part of the previous tick's displacement
//!    perpendicular to the new heading.
//! 5. The position is clamped into the field.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Point2, Rotation2, Vector2};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

// Internal
use super::SimParams;
use crate::arc::cross2;
use util::{maths::wrap_2pi, time::ticks_to_seconds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the simulated robot at the end of a tick.
///
/// This struct is kept flat so it can be archived as CSV rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimState {
    /// Number of ticks since the start of the simulation
    pub tick: usize,

    /// Simulated time
    pub time_s: f64,

    pub x_in: f64,

    pub y_in: f64,

    /// Heading of the robot in [0, 2pi)
    pub heading_rad: f64,

    /// Total distance driven by the left wheel
    pub left_enc_in: f64,

    /// Total distance driven by the right wheel
    pub right_enc_in: f64,

    /// Left wheel velocity after limiting
    pub left_vel_ins: f64,

    /// Right wheel velocity after limiting
    pub right_vel_ins: f64,
}

/// Kinematic simulator for a differential drive robot.
#[derive(Debug, Clone)]
pub struct Simulator {
    params: SimParams,

    state: SimState,

    /// Displacement of the robot over the previous tick, used for slip
    prev_displacement: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimState {
    /// State of a robot at rest at the given pose.
    pub fn at_rest(position: Point2<f64>, heading_rad: f64) -> Self {
        Self {
            tick: 0,
            time_s: 0.0,
            x_in: position.x,
            y_in: position.y,
            heading_rad: wrap_2pi(heading_rad),
            left_enc_in: 0.0,
            right_enc_in: 0.0,
            left_vel_ins: 0.0,
            right_vel_ins: 0.0,
        }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x_in, self.y_in)
    }

    /// Translational speed of the robot.
    pub fn speed_ins(&self) -> f64 {
        (self.left_vel_ins + self.right_vel_ins).abs() / 2.0
    }

    /// Mean of the two encoder distances.
    pub fn mean_enc_in(&self) -> f64 {
        (self.left_enc_in + self.right_enc_in) / 2.0
    }
}

impl Simulator {
    pub fn new(params: SimParams, start: SimState) -> Self {
        Self {
            params,
            state: start,
            prev_displacement: Vector2::zeros(),
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Advance the simulation by one tick with the given wheel velocity
    /// commands.
    pub fn tick(&mut self, left_ins: f64, right_ins: f64) -> SimState {
        let dt = self.params.timestep_s;
        let max_vel = self.params.max_velocity_ins;
        let max_delta = self.params.max_accel_inss * dt;

        let left = limit_wheel(left_ins, self.state.left_vel_ins, max_vel, max_delta);
        let right = limit_wheel(right_ins, self.state.right_vel_ins, max_vel, max_delta);

        let prev_pos = self.state.position();
        let heading = self.state.heading_rad;

        let (mut pos, new_heading) = if left == right {
            let dist = left * dt;
            (prev_pos + dist * Vector2::new(heading.cos(), heading.sin()), heading)
        }
        else {
            let width = self.params.wheel_base_in;
            let omega = (right - left) / width;
            let radius = (width / 2.0) * (left + right) / (right - left);
            let icc = Point2::new(
                prev_pos.x - radius * heading.sin(),
                prev_pos.y + radius * heading.cos()
            );

            let rot = Rotation2::new(omega * dt);
            (icc + rot * (prev_pos - icc), wrap_2pi(heading + omega * dt))
        };

        // Slip: the component of last tick's motion perpendicular to the new
        // heading is only partly resisted by the wheels
        let dir = Vector2::new(new_heading.cos(), new_heading.sin());
        let lateral = cross2(&dir, &self.prev_displacement);
        let normal_heading = new_heading + FRAC_PI_2;
        pos += lateral
            * (1.0 - self.params.lateral_friction)
            * Vector2::new(normal_heading.cos(), normal_heading.sin());

        self.prev_displacement = pos - prev_pos;

        let field = self.params.field_size_in;
        pos = Point2::new(pos.x.max(0.0).min(field), pos.y.max(0.0).min(field));

        self.state = SimState {
            tick: self.state.tick + 1,
            time_s: ticks_to_seconds(self.state.tick + 1, dt),
            x_in: pos.x,
            y_in: pos.y,
            heading_rad: new_heading,
            left_enc_in: self.state.left_enc_in + left * dt,
            right_enc_in: self.state.right_enc_in + right * dt,
            left_vel_ins: left,
            right_vel_ins: right,
        };

        trace!(
            "Sim tick {}: ({:.3}, {:.3}) @ {:.4} rad, wheels ({:.2}, {:.2})",
            self.state.tick,
            self.state.x_in,
            self.state.y_in,
            self.state.heading_rad,
            left,
            right
        );

        self.state
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a wheel velocity command to the maximum velocity, then to within
/// `max_delta` of the previous velocity.
fn limit_wheel(cmd: f64, prev: f64, max_vel: f64, max_delta: f64) -> f64 {
    let cmd = if cmd.is_nan() { 0.0 } else { cmd };
    cmd.max(-max_vel)
        .min(max_vel)
        .max(prev - max_delta)
        .min(prev + max_delta)
}
