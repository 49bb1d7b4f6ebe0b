//! # Command playback
//!
//! `Playback` drives a `Simulator` through a sequence of commands. It is a
//! small state machine with the following modes:
//!
//! - `InitCommand` - Initialise the next command, or start coasting if there
//!   are none left.
//! - `ExecCommand` - Tick the current command until it is done, fails, or
//!   runs out of ticks.
//! - `Coast` - All commands are finished, tick with zero input until the
//!   robot has slowed down.
//! - `Finished` - Nothing left to do.
//!
//! Playback is an iterator over the simulated states, one per tick. Dropping
//! it at any point cancels the playback.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{commands_from_graph, start_state, DriveCommand, SimParams, SimState, Simulator};
use crate::graph::PathGraph;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executes commands against the simulator one tick at a time.
#[derive(Debug)]
pub struct Playback {
    sim: Simulator,

    commands: Vec<Box<dyn DriveCommand>>,

    /// Index of the current command
    current: usize,

    mode: Mode,

    /// Tick at which the current command started
    cmd_start_tick: usize,

    coast_ticks: usize,

    reports: Vec<CommandReport>,
}

/// The result of running a playback to the end.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    /// Every state of the robot, starting with the initial state
    pub states: Vec<SimState>,

    pub reports: Vec<CommandReport>,
}

/// Summary of the execution of a single command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReport {
    pub name: String,

    pub start_tick: usize,

    pub end_tick: usize,

    pub outcome: CommandOutcome,
}

/// Output of one mode's step.
struct StepOutput {
    /// State produced by ticking the simulator, if it was ticked
    state: Option<SimState>,

    /// Mode to switch to after this step
    next_mode: Option<Mode>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CommandOutcome {
    Completed,

    /// The command did not finish within the tick limit
    TimedOut,

    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    InitCommand,
    ExecCommand,
    Coast,
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Playback {
    pub fn new(sim: Simulator, commands: Vec<Box<dyn DriveCommand>>) -> Self {
        Self {
            sim,
            commands,
            current: 0,
            mode: Mode::InitCommand,
            cmd_start_tick: 0,
            coast_ticks: 0,
            reports: vec![],
        }
    }

    /// Build a playback of the whole path, starting at rest on the start
    /// waypoint.
    pub fn from_graph(graph: &PathGraph, params: SimParams) -> Self {
        let commands = commands_from_graph(graph, &params);
        let sim = Simulator::new(params, start_state(graph));
        Self::new(sim, commands)
    }

    pub fn state(&self) -> &SimState {
        self.sim.state()
    }

    /// Reports of the commands which have ended so far.
    pub fn reports(&self) -> &[CommandReport] {
        &self.reports
    }

    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Finished
    }

    /// Run the playback to the end.
    pub fn run(mut self) -> Trajectory {
        let mut states = vec![*self.sim.state()];
        states.extend(&mut self);

        info!(
            "Playback finished after {} ticks ({:.2} s)",
            self.sim.state().tick,
            self.sim.state().time_s
        );

        Trajectory {
            states,
            reports: self.reports,
        }
    }

    fn mode_init_command(&mut self) -> StepOutput {
        let tick = self.sim.state().tick;

        let cmd = match self.commands.get_mut(self.current) {
            Some(c) => c,
            None => {
                debug!("All commands executed, coasting");
                return StepOutput::switch(Mode::Coast);
            }
        };

        match cmd.init(self.sim.state()) {
            Ok(()) => {
                debug!("Starting command \"{}\" at tick {}", cmd.name(), tick);
                self.cmd_start_tick = tick;
                StepOutput::switch(Mode::ExecCommand)
            }
            Err(e) => {
                warn!("Could not initialise command \"{}\": {}", cmd.name(), e);
                self.end_command(CommandOutcome::Failed(e.to_string()));
                StepOutput::switch(Mode::InitCommand)
            }
        }
    }

    fn mode_exec_command(&mut self) -> StepOutput {
        let state = *self.sim.state();
        let timeout = self.sim.params().cmd_timeout_ticks;

        let cmd = match self.commands.get_mut(self.current) {
            Some(c) => c,
            None => return StepOutput::switch(Mode::InitCommand),
        };

        if state.tick - self.cmd_start_tick >= timeout {
            warn!(
                "Command \"{}\" did not finish within {} ticks, skipping it",
                cmd.name(),
                timeout
            );
            self.end_command(CommandOutcome::TimedOut);
            return StepOutput::switch(Mode::InitCommand);
        }

        let input = match cmd.tick(&state) {
            Ok(i) => i,
            Err(e) => {
                warn!("Command \"{}\" failed: {}", cmd.name(), e);
                self.end_command(CommandOutcome::Failed(e.to_string()));
                return StepOutput::switch(Mode::InitCommand);
            }
        };

        let new_state = self.sim.tick(input.left_ins, input.right_ins);

        if input.is_done {
            self.end_command(CommandOutcome::Completed);
            StepOutput {
                state: Some(new_state),
                next_mode: Some(Mode::InitCommand),
            }
        }
        else {
            StepOutput {
                state: Some(new_state),
                next_mode: None,
            }
        }
    }

    fn mode_coast(&mut self) -> StepOutput {
        let params = self.sim.params();
        if self.sim.state().speed_ins() < params.coast_speed_threshold_ins
            || self.coast_ticks >= params.max_coast_ticks
        {
            return StepOutput::switch(Mode::Finished);
        }

        self.coast_ticks += 1;

        StepOutput {
            state: Some(self.sim.tick(0.0, 0.0)),
            next_mode: None,
        }
    }

    /// Record the end of the current command and move on to the next.
    fn end_command(&mut self, outcome: CommandOutcome) {
        if let Some(cmd) = self.commands.get(self.current) {
            let report = CommandReport {
                name: cmd.name(),
                start_tick: self.cmd_start_tick,
                end_tick: self.sim.state().tick,
                outcome,
            };
            debug!("Command ended: {:?}", report);
            self.reports.push(report);
        }

        self.current += 1;
        self.cmd_start_tick = self.sim.state().tick;
    }
}

impl Iterator for Playback {
    type Item = SimState;

    fn next(&mut self) -> Option<SimState> {
        loop {
            let out = match self.mode {
                Mode::InitCommand => self.mode_init_command(),
                Mode::ExecCommand => self.mode_exec_command(),
                Mode::Coast => self.mode_coast(),
                Mode::Finished => return None,
            };

            if let Some(m) = out.next_mode {
                self.mode = m;
            }

            if out.state.is_some() {
                return out.state;
            }
        }
    }
}

impl StepOutput {
    /// Switch mode without ticking the simulator.
    fn switch(mode: Mode) -> Self {
        Self {
            state: None,
            next_mode: Some(mode),
        }
    }
}

impl Trajectory {
    /// Final state of the robot.
    pub fn last(&self) -> Option<&SimState> {
        self.states.last()
    }

    /// Number of commands which did not complete.
    pub fn num_failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome != CommandOutcome::Completed)
            .count()
    }
}
