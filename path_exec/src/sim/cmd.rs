//! # Drive commands
//!
//! Commands turn the finalised path graph into wheel velocity demands. Each
//! command is initialised once with the state the robot is in when it starts,
//! then ticked until it reports that it is done.
//!
//! Four commands are generated from a path:
//!
//! - `StraightCommand` drives along a straight segment.
//! - `CurveCommand` follows a circular segment.
//! - `TurnCommand` turns on the spot to a heading.
//! - `WaitCommand` stands still at a waypoint for a fixed time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Point2;
use serde::Serialize;
use std::f64::consts::{PI, TAU};
use std::fmt::Debug;
use thiserror::Error;

// Internal
use super::{Pid, PidConfig, PidError, SimParams, SimState};
use crate::arc::{cross2, Arc};
use crate::graph::{DriveMode, DriveSettings, PathGraph, Segment, TurnMode};
use util::maths::{get_ang_dist_2pi, get_ang_sweep, heading_between, headings_eq, wrap_2pi};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A command which can be executed by the playback loop.
pub trait DriveCommand: Debug {
    /// Short human readable name of the command.
    fn name(&self) -> String;

    /// Prepare the command to start from the given state.
    fn init(&mut self, state: &SimState) -> Result<(), CmdError>;

    /// Compute the wheel demands for the next tick.
    fn tick(&mut self, state: &SimState) -> Result<ControllerInput, CmdError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wheel velocity demands produced by a command for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerInput {
    pub left_ins: f64,

    pub right_ins: f64,

    /// True once the command has reached its goal
    pub is_done: bool,
}

/// Drive along a straight segment.
#[derive(Debug)]
pub struct StraightCommand {
    name: String,
    params: SimParams,

    from: Point2<f64>,
    to: Point2<f64>,
    reversed: bool,
    drive: DriveSettings,

    /// Heading the robot should face while driving
    goal_heading_rad: f64,

    exec: Option<DriveExec>,
}

/// Follow a circular segment.
#[derive(Debug)]
pub struct CurveCommand {
    name: String,
    params: SimParams,

    arc: Arc,
    reversed: bool,
    drive: DriveSettings,

    exec: Option<DriveExec>,
}

/// Turn on the spot to face a heading.
#[derive(Debug)]
pub struct TurnCommand {
    name: String,
    params: SimParams,

    goal_heading_rad: f64,
    mode: TurnMode,

    pid: Option<Pid>,
}

/// Stand still for a number of ticks.
///
/// A wait longer than the playback's command timeout is cut short by the
/// timeout.
#[derive(Debug)]
pub struct WaitCommand {
    name: String,

    num_ticks: usize,

    /// Ticks waited so far, `None` until initialised
    ticks: Option<usize>,
}

/// Controllers of an executing straight or curve command.
#[derive(Debug)]
struct DriveExec {
    /// Position of the robot when the command started
    start: Point2<f64>,

    dist: DistanceCtrl,

    head_pid: Pid,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CmdError {
    #[error("Command {0} was ticked before it was initialised")]
    NotInitialised(String),

    #[error("Controller error in command {0}: {1}")]
    ControllerError(String, PidError),

    #[error("Command {0} failed: {1}")]
    Failed(String, String),
}

/// Progress control along a segment.
#[derive(Debug)]
enum DistanceCtrl {
    /// Speed from a PID on the remaining distance
    Pid(Pid),

    /// Constant speed until the end point is passed
    UntilPassed(Pid),

    /// Constant speed for a fixed number of ticks
    Timed {
        speed_ins: f64,
        num_ticks: usize,
        ticks: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DistanceCtrl {
    /// Build the controller for the drive settings. The speed is limited to
    /// `speed_cap_ins` as well as by the drive's speed fraction.
    fn new(drive: &DriveSettings, params: &SimParams, speed_cap_ins: f64) -> Result<Self, PidError> {
        let cp = &params.cmd;
        let max_speed = (drive.speed_fraction * params.max_velocity_ins).min(speed_cap_ins);
        let gains = PidConfig::new(cp.dist_k_p, cp.dist_k_i, cp.dist_k_d);
        let min_speed = cp.dist_min_output_frac * params.max_velocity_ins;

        let config = match drive.mode {
            DriveMode::Precise => gains
                .with_limits(min_speed, max_speed)
                .with_tolerance(cp.precise_dist_tolerance_in, cp.precise_dist_repeats),
            DriveMode::Fast => gains
                .with_limits(min_speed, max_speed)
                .with_tolerance(cp.fast_dist_tolerance_in, cp.fast_dist_repeats),
            DriveMode::NoSlowdown => {
                let config = gains.with_limits(max_speed, max_speed).with_overshoot();
                return Ok(DistanceCtrl::UntilPassed(
                    Pid::with_completion(config, params.timestep_s)?
                ));
            }
            DriveMode::Timed { time_s } => {
                return Ok(DistanceCtrl::Timed {
                    speed_ins: max_speed,
                    num_ticks: params.ticks_for(time_s),
                    ticks: 0,
                })
            }
        };

        Ok(DistanceCtrl::Pid(Pid::with_completion(config, params.timestep_s)?))
    }

    /// Speed along the direction of travel for the remaining distance.
    fn tick(&mut self, remaining_in: f64) -> f64 {
        match self {
            DistanceCtrl::Pid(pid) => pid.tick(remaining_in),
            DistanceCtrl::UntilPassed(pid) => pid.tick(remaining_in).abs(),
            DistanceCtrl::Timed { speed_ins, ticks, .. } => {
                *ticks += 1;
                *speed_ins
            }
        }
    }

    fn is_done(&self) -> Result<bool, PidError> {
        match self {
            DistanceCtrl::Pid(pid) | DistanceCtrl::UntilPassed(pid) => pid.is_done(),
            DistanceCtrl::Timed { num_ticks, ticks, .. } => Ok(ticks >= num_ticks),
        }
    }
}

impl DriveExec {
    fn new(
        state: &SimState,
        drive: &DriveSettings,
        params: &SimParams,
        speed_cap_ins: f64
    ) -> Result<Self, PidError> {
        let cp = &params.cmd;
        let head_cfg = PidConfig::new(cp.head_k_p, cp.head_k_i, cp.head_k_d)
            .with_limits(0.0, cp.head_max_output_ins);

        Ok(Self {
            start: state.position(),
            dist: DistanceCtrl::new(drive, params, speed_cap_ins)?,
            head_pid: Pid::new(head_cfg, params.timestep_s),
        })
    }
}

impl StraightCommand {
    pub fn new(name: &str, segment: &Segment, params: &SimParams) -> Self {
        Self {
            name: name.to_string(),
            params: params.clone(),
            from: segment.arc.from,
            to: segment.arc.to,
            reversed: segment.reversed,
            drive: segment.drive,
            goal_heading_rad: segment.goal_heading_rad(),
            exec: None,
        }
    }
}

impl DriveCommand for StraightCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, state: &SimState) -> Result<(), CmdError> {
        let exec = DriveExec::new(state, &self.drive, &self.params, std::f64::INFINITY)
            .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?;
        self.exec = Some(exec);
        Ok(())
    }

    /// Progress is measured along the segment's direction from where the
    /// robot started, so lateral error does not count as progress. The
    /// heading controller aims slightly across the segment to remove any
    /// lateral error.
    fn tick(&mut self, state: &SimState) -> Result<ControllerInput, CmdError> {
        let exec = match self.exec.as_mut() {
            Some(e) => e,
            None => return Err(CmdError::NotInitialised(self.name.clone())),
        };

        let chord = self.to - self.from;
        let length = chord.norm();
        let dir = chord / length;
        let progress = (state.position() - exec.start).dot(&dir);

        let sign = if self.reversed { -1.0 } else { 1.0 };
        let v = exec.dist.tick(length - progress) * sign;

        // Aim back towards the line when off to one side of it
        let cross_track = cross2(&dir, &(state.position() - self.from));
        let goal = wrap_2pi(
            self.goal_heading_rad - (self.params.cmd.straight_cross_track_k * cross_track).atan()
        );
        let head_err = get_ang_dist_2pi(state.heading_rad, goal);
        let dv = exec.head_pid.tick(head_err);

        let is_done = exec
            .dist
            .is_done()
            .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?;

        Ok(ControllerInput {
            left_ins: v - dv,
            right_ins: v + dv,
            is_done,
        })
    }
}

impl CurveCommand {
    pub fn new(name: &str, segment: &Segment, params: &SimParams) -> Self {
        Self {
            name: name.to_string(),
            params: params.clone(),
            arc: segment.arc,
            reversed: segment.reversed,
            drive: segment.drive,
            exec: None,
        }
    }

    /// Distance along the arc of the point on the circle nearest to
    /// `position`. Points behind the start of the arc give negative values.
    fn progress_in(&self, position: &Point2<f64>) -> f64 {
        let (center, parity) = match (self.arc.center, self.arc.parity) {
            (Some(c), Some(p)) => (c, p),
            _ => return 0.0,
        };

        let ang = heading_between(center.x, center.y, position.x, position.y);
        let mut swept = get_ang_sweep(self.arc.theta1_rad, ang, parity.is_ccw());

        // Split the unswept part of the circle halfway between the two ends
        if swept > (self.arc.sweep_rad() + TAU) / 2.0 {
            swept -= TAU;
        }

        swept * self.arc.radius_in
    }
}

impl DriveCommand for CurveCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, state: &SimState) -> Result<(), CmdError> {
        if self.arc.center.is_none() {
            return Err(CmdError::Failed(
                self.name.clone(),
                "the segment is not curved".into(),
            ));
        }

        let speed_cap = (self.params.cmd.curve_max_lat_accel_inss * self.arc.radius_in).sqrt();
        let exec = DriveExec::new(state, &self.drive, &self.params, speed_cap)
            .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?;
        self.exec = Some(exec);
        Ok(())
    }

    /// The distance controller sets the speed along the arc and a feed
    /// forward term splits it between the wheels to follow the arc's
    /// curvature. The heading controller trims towards the arc's tangent,
    /// offset inwards or outwards to pull the robot back onto the arc.
    fn tick(&mut self, state: &SimState) -> Result<ControllerInput, CmdError> {
        let position = state.position();
        let progress = self.progress_in(&position);
        let radial_err = match self.arc.center {
            Some(c) => (position - c).norm() - self.arc.radius_in,
            None => 0.0,
        };

        let exec = match self.exec.as_mut() {
            Some(e) => e,
            None => return Err(CmdError::NotInitialised(self.name.clone())),
        };

        let length = self.arc.arc_length_in;
        let sign = if self.reversed { -1.0 } else { 1.0 };
        let v = exec.dist.tick(length - progress) * sign;

        // Curvature in the robot's frame flips when driving backwards
        let curvature = self.arc.curvature_in() * sign;
        let half_width = self.params.wheel_base_in / 2.0;

        let parity_sign = self.arc.parity.map(|p| p.signum()).unwrap_or(0.0);
        let mut goal = self.arc.heading_at(progress.max(0.0).min(length))
            + parity_sign * (self.params.cmd.curve_radial_k * radial_err).atan();
        if self.reversed {
            goal = wrap_2pi(goal + PI);
        }
        let head_err = get_ang_dist_2pi(state.heading_rad, goal);
        let dv = exec.head_pid.tick(head_err);

        let is_done = exec
            .dist
            .is_done()
            .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?;

        Ok(ControllerInput {
            left_ins: v * (1.0 - curvature * half_width) - dv,
            right_ins: v * (1.0 + curvature * half_width) + dv,
            is_done,
        })
    }
}

impl TurnCommand {
    pub fn new(name: &str, goal_heading_rad: f64, mode: TurnMode, params: &SimParams) -> Self {
        Self {
            name: name.to_string(),
            params: params.clone(),
            goal_heading_rad: wrap_2pi(goal_heading_rad),
            mode,
            pid: None,
        }
    }

    pub fn goal_heading_rad(&self) -> f64 {
        self.goal_heading_rad
    }
}

impl DriveCommand for TurnCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, _state: &SimState) -> Result<(), CmdError> {
        let cp = &self.params.cmd;
        let (tol, repeats) = match self.mode {
            TurnMode::Precise => (cp.precise_turn_tolerance_rad, cp.precise_turn_repeats),
            TurnMode::Fast => (cp.fast_turn_tolerance_rad, cp.fast_turn_repeats),
        };

        let config = PidConfig::new(cp.turn_k_p, cp.turn_k_i, cp.turn_k_d)
            .with_limits(
                cp.turn_min_output_frac * self.params.max_velocity_ins,
                self.params.max_velocity_ins
            )
            .with_tolerance(tol, repeats);

        self.pid = Some(
            Pid::with_completion(config, self.params.timestep_s)
                .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?
        );
        Ok(())
    }

    fn tick(&mut self, state: &SimState) -> Result<ControllerInput, CmdError> {
        let pid = match self.pid.as_mut() {
            Some(p) => p,
            None => return Err(CmdError::NotInitialised(self.name.clone())),
        };

        let err = get_ang_dist_2pi(state.heading_rad, self.goal_heading_rad);
        let v = pid.tick(err);

        let is_done = pid
            .is_done()
            .map_err(|e| CmdError::ControllerError(self.name.clone(), e))?;

        Ok(ControllerInput {
            left_ins: -v,
            right_ins: v,
            is_done,
        })
    }
}

impl WaitCommand {
    pub fn new(name: &str, wait_s: f64, params: &SimParams) -> Self {
        Self {
            name: name.to_string(),
            num_ticks: params.ticks_for(wait_s).max(1),
            ticks: None,
        }
    }
}

impl DriveCommand for WaitCommand {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn init(&mut self, _state: &SimState) -> Result<(), CmdError> {
        self.ticks = Some(0);
        Ok(())
    }

    fn tick(&mut self, _state: &SimState) -> Result<ControllerInput, CmdError> {
        let ticks = match self.ticks.as_mut() {
            Some(t) => t,
            None => return Err(CmdError::NotInitialised(self.name.clone())),
        };

        *ticks += 1;

        Ok(ControllerInput {
            left_ins: 0.0,
            right_ins: 0.0,
            is_done: *ticks >= self.num_ticks,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// State of the robot placed at rest on the start waypoint.
pub fn start_state(graph: &PathGraph) -> SimState {
    let start = graph.start();
    SimState::at_rest(start.position, start.start_heading_rad().unwrap_or(0.0))
}

/// Build the sequence of commands which drives the path.
///
/// Each segment produces a straight or curve command. A turn is added
/// wherever the robot's facing on arrival at a waypoint differs from the
/// facing needed to leave it, and an aim turn is added before leaving any
/// waypoint with an aim override. A waypoint with a wait time starts with a
/// wait, before any turns.
pub fn commands_from_graph(graph: &PathGraph, params: &SimParams) -> Vec<Box<dyn DriveCommand>> {
    let tol = graph.params().heading_tolerance_rad;
    let waypoints = graph.waypoints();
    let segments = graph.segments();

    let mut cmds: Vec<Box<dyn DriveCommand>> = vec![];
    let mut facing = graph.start().start_heading_rad().unwrap_or(0.0);

    for (i, wp) in waypoints.iter().enumerate() {
        if wp.wait_s() > 0.0 {
            cmds.push(Box::new(WaitCommand::new(&format!("wait {}", i), wp.wait_s(), params)));
        }

        if let Some(aim) = wp.aim_heading_rad() {
            cmds.push(Box::new(TurnCommand::new(
                &format!("aim {}", i),
                aim,
                wp.turn_mode(),
                params
            )));
            facing = aim;
        }

        let seg = match segments.get(i) {
            Some(s) => s,
            None => break,
        };

        let depart = seg.entry_facing_rad();
        if !headings_eq(facing, depart, tol) {
            cmds.push(Box::new(TurnCommand::new(
                &format!("turn {}", i),
                depart,
                wp.turn_mode(),
                params
            )));
        }

        let name = format!("segment {}", i);
        if seg.is_straight() {
            cmds.push(Box::new(StraightCommand::new(&name, seg, params)));
        }
        else {
            cmds.push(Box::new(CurveCommand::new(&name, seg, params)));
        }

        facing = seg.exit_facing_rad();
    }

    debug!("Generated {} commands from the path", cmds.len());

    cmds
}
