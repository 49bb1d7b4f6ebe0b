//! Waypoints of the path graph

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// Internal
use super::SegmentId;
use util::maths::{heading_between, wrap_2pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Index of a waypoint in the chain.
///
/// Ids are positional, so any structural edit (append, insert, delete) may
/// invalidate previously held ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaypointId(pub usize);

/// A point on the path at which the robot arrives and may turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    /// Position on the field
    pub position: Point2<f64>,

    /// Role of this waypoint and its settings
    pub kind: WaypointKind,

    /// Segment arriving at this waypoint, `None` for the start
    pub incoming: Option<SegmentId>,

    /// Segment leaving this waypoint, `None` for the tail
    pub outgoing: Option<SegmentId>,

    /// Direction the robot must turn on the spot here, derived by recompute
    pub turn: TurnDirection,
}

/// Turn the robot to face a point before leaving a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimOverride {
    /// Point to face
    pub target: Point2<f64>,

    /// Added to the bearing of the target
    pub heading_correction_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaypointKind {
    /// Head of the chain, where the robot is placed
    Start {
        heading_rad: f64,
    },

    /// Any other waypoint
    Turn {
        aim: Option<AimOverride>,
        turn_mode: TurnMode,

        /// Time to stand still after arriving, zero for no stop
        wait_s: f64,
    },
}

/// How tightly turns made at a waypoint are controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnMode {
    Precise,
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    None,

    /// Counter-clockwise
    Left,

    /// Clockwise
    Right,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TurnMode {
    fn default() -> Self {
        TurnMode::Precise
    }
}

impl AimOverride {
    /// Heading to face from `from` in order to aim at the target.
    pub fn heading_from(&self, from: &Point2<f64>) -> f64 {
        wrap_2pi(
            heading_between(from.x, from.y, self.target.x, self.target.y)
            + self.heading_correction_rad
        )
    }
}

impl Waypoint {
    pub fn new_start(position: Point2<f64>, heading_rad: f64) -> Self {
        Self {
            position,
            kind: WaypointKind::Start {
                heading_rad: wrap_2pi(heading_rad),
            },
            incoming: None,
            outgoing: None,
            turn: TurnDirection::None,
        }
    }

    pub fn new_turn(position: Point2<f64>) -> Self {
        Self {
            position,
            kind: WaypointKind::Turn {
                aim: None,
                turn_mode: TurnMode::default(),
                wait_s: 0.0,
            },
            incoming: None,
            outgoing: None,
            turn: TurnDirection::None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, WaypointKind::Start { .. })
    }

    /// The start heading, if this is the start waypoint.
    pub fn start_heading_rad(&self) -> Option<f64> {
        match self.kind {
            WaypointKind::Start { heading_rad } => Some(heading_rad),
            WaypointKind::Turn { .. } => None,
        }
    }

    /// Turn mode used for turns at this waypoint. The start always turns
    /// precisely.
    pub fn turn_mode(&self) -> TurnMode {
        match self.kind {
            WaypointKind::Start { .. } => TurnMode::Precise,
            WaypointKind::Turn { turn_mode, .. } => turn_mode,
        }
    }

    pub fn aim(&self) -> Option<&AimOverride> {
        match &self.kind {
            WaypointKind::Start { .. } => None,
            WaypointKind::Turn { aim, .. } => aim.as_ref(),
        }
    }

    /// Heading the robot faces when aiming from this waypoint, if it has an
    /// aim override.
    pub fn aim_heading_rad(&self) -> Option<f64> {
        self.aim().map(|a| a.heading_from(&self.position))
    }

    /// Time the robot stands still after arriving here.
    pub fn wait_s(&self) -> f64 {
        match self.kind {
            WaypointKind::Start { .. } => 0.0,
            WaypointKind::Turn { wait_s, .. } => wait_s,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_aim_heading() {
        let mut wp = Waypoint::new_turn(Point2::new(10.0, 10.0));
        assert!(wp.aim_heading_rad().is_none());

        wp.kind = WaypointKind::Turn {
            aim: Some(AimOverride {
                target: Point2::new(10.0, 50.0),
                heading_correction_rad: -0.1,
            }),
            turn_mode: TurnMode::Fast,
            wait_s: 0.5,
        };
        assert_abs_diff_eq!(wp.aim_heading_rad().unwrap(), FRAC_PI_2 - 0.1, epsilon = 1e-12);
        assert_eq!(wp.turn_mode(), TurnMode::Fast);
        assert_eq!(wp.wait_s(), 0.5);
    }

    #[test]
    fn test_start_heading_is_wrapped() {
        let wp = Waypoint::new_start(Point2::new(0.0, 0.0), -FRAC_PI_2);
        assert!(wp.is_start());
        assert_abs_diff_eq!(wp.start_heading_rad().unwrap(), 3.0 * FRAC_PI_2, epsilon = 1e-12);
        assert!(wp.aim().is_none());
        assert_eq!(wp.wait_s(), 0.0);
    }
}
