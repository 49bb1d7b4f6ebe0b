//! Simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive simulator and command playback
#[derive(Deserialize, Debug, Clone)]
pub struct SimParams {

    /// Distance between the left and right wheels
    pub wheel_base_in: f64,

    /// Maximum velocity of a single wheel
    pub max_velocity_ins: f64,

    /// Maximum rate of change of a single wheel's velocity
    pub max_accel_inss: f64,

    /// Duration of one simulation tick
    pub timestep_s: f64,

    /// Coefficient of friction perpendicular to the robot's heading, between
    /// 0 (all sideways motion is kept) and 1 (no sideways motion).
    pub lateral_friction: f64,

    /// Side length of the square field the robot is confined to
    pub field_size_in: f64,

    /// Number of ticks after which a command that has not finished is
    /// abandoned
    pub cmd_timeout_ticks: usize,

    /// Once all commands are finished the simulation continues with zero
    /// input until the robot's speed drops below this threshold.
    pub coast_speed_threshold_ins: f64,

    /// Upper limit on the number of coasting ticks
    pub max_coast_ticks: usize,

    /// Tuning of the drive commands
    pub cmd: CmdParams,
}

/// Controller tuning for the drive commands
#[derive(Deserialize, Debug, Clone)]
pub struct CmdParams {
    /// Distance controller proportional gain
    pub dist_k_p: f64,

    /// Distance controller integral gain
    pub dist_k_i: f64,

    /// Distance controller derivative gain
    pub dist_k_d: f64,

    /// Minimum distance controller output as a fraction of the maximum wheel
    /// velocity
    pub dist_min_output_frac: f64,

    /// Distance tolerance of precise drives
    pub precise_dist_tolerance_in: f64,

    pub precise_dist_repeats: usize,

    /// Distance tolerance of fast drives
    pub fast_dist_tolerance_in: f64,

    pub fast_dist_repeats: usize,

    /// Heading correction controller proportional gain
    pub head_k_p: f64,

    /// Heading correction controller integral gain
    pub head_k_i: f64,

    /// Heading correction controller derivative gain
    pub head_k_d: f64,

    /// Maximum wheel velocity difference applied for heading correction
    pub head_max_output_ins: f64,

    /// Gain from lateral error to heading offset when driving straight. The
    /// robot aims `atan(straight_cross_track_k * error)` back across the
    /// segment.
    pub straight_cross_track_k: f64,

    /// Gain from radial error to heading offset when following a curve. The
    /// robot aims `atan(curve_radial_k * error)` inwards of the tangent when
    /// outside the arc.
    pub curve_radial_k: f64,

    /// Sideways acceleration limit used to cap the speed on curves at
    /// `sqrt(curve_max_lat_accel_inss * radius)`
    pub curve_max_lat_accel_inss: f64,

    /// Turn controller proportional gain
    pub turn_k_p: f64,

    /// Turn controller integral gain
    pub turn_k_i: f64,

    /// Turn controller derivative gain
    pub turn_k_d: f64,

    /// Minimum turn controller output as a fraction of the maximum wheel
    /// velocity
    pub turn_min_output_frac: f64,

    /// Heading tolerance of precise turns
    pub precise_turn_tolerance_rad: f64,

    pub precise_turn_repeats: usize,

    /// Heading tolerance of fast turns
    pub fast_turn_tolerance_rad: f64,

    pub fast_turn_repeats: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            wheel_base_in: 10.0,
            max_velocity_ins: 25.0,
            max_accel_inss: 40.0,
            timestep_s: 0.05,
            lateral_friction: 0.5,
            field_size_in: 144.0,
            cmd_timeout_ticks: 200,
            coast_speed_threshold_ins: 0.5,
            max_coast_ticks: 100,
            cmd: CmdParams::default(),
        }
    }
}

impl Default for CmdParams {
    fn default() -> Self {
        Self {
            dist_k_p: 4.0,
            dist_k_i: 0.0,
            dist_k_d: 0.2,
            dist_min_output_frac: 0.05,
            precise_dist_tolerance_in: 0.3,
            precise_dist_repeats: 3,
            fast_dist_tolerance_in: 1.0,
            fast_dist_repeats: 1,
            head_k_p: 40.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            head_max_output_ins: 10.0,
            straight_cross_track_k: 0.1,
            curve_radial_k: 0.2,
            curve_max_lat_accel_inss: 10.0,
            turn_k_p: 12.0,
            turn_k_i: 0.0,
            turn_k_d: 0.2,
            turn_min_output_frac: 0.08,
            precise_turn_tolerance_rad: 0.0349,
            precise_turn_repeats: 3,
            fast_turn_tolerance_rad: 0.0873,
            fast_turn_repeats: 1,
        }
    }
}

impl SimParams {
    /// Number of ticks needed to cover the given duration, rounded up.
    pub fn ticks_for(&self, duration_s: f64) -> usize {
        (duration_s / self.timestep_s).ceil().max(0.0) as usize
    }
}
