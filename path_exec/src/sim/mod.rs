//! # Simulation module
//!
//! Previews how a robot would drive a path. The path graph is turned into a
//! sequence of drive commands (`cmd`), each of which produces wheel velocity
//! demands from PID controllers (`pid`). The playback loop (`exec`) feeds the
//! demands into a kinematic differential drive simulator (`simulator`) one
//! fixed timestep at a time.
//!
//! The simulator does not manage real time, a caller wanting to animate the
//! preview maps ticks onto wall clock time itself.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod exec;
mod params;
mod pid;
mod simulator;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use cmd::{
    commands_from_graph, start_state, CmdError, ControllerInput, CurveCommand, DriveCommand,
    StraightCommand, TurnCommand, WaitCommand,
};
pub use exec::{CommandOutcome, CommandReport, Playback, Trajectory};
pub use params::{CmdParams, SimParams};
pub use pid::{limit_output, Pid, PidConfig, PidError};
pub use simulator::{SimState, Simulator};
