//! Segments of the path graph

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Internal
use super::WaypointId;
use crate::arc::{straight_heading, Arc};
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Index of a segment in the chain. Segment `i` joins waypoint `i` to
/// waypoint `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

/// How the robot should drive along a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveSettings {
    pub mode: DriveMode,

    /// Fraction of the maximum wheel velocity to drive at, in (0, 1]
    pub speed_fraction: f64,
}

/// The connection between two consecutive waypoints.
///
/// The only geometric input owned by a segment is its entry heading. The arc,
/// and everything derived from it, is rebuilt by `PathGraph::recompute`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// Waypoint the segment leaves from
    pub prev: WaypointId,

    /// Waypoint the segment arrives at
    pub next: WaypointId,

    /// Heading of travel when leaving `prev`
    ///
    /// Units: radians
    pub entry_heading_rad: f64,

    /// If true the robot drives the segment backwards
    pub reversed: bool,

    pub drive: DriveSettings,

    /// Derived geometry of the segment
    pub arc: Arc,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DriveMode {
    /// Slow down into the end point and settle within a tight tolerance
    Precise,

    /// Slow down into the end point with a loose tolerance
    Fast,

    /// Hold speed until the end point is passed
    NoSlowdown,

    /// Drive at the set speed for a fixed time, ignoring distance
    Timed {
        time_s: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            mode: DriveMode::Precise,
            speed_fraction: 1.0,
        }
    }
}

impl Segment {
    /// Create a new segment with default drive settings.
    ///
    /// Links are filled in by the graph's relink.
    pub(crate) fn new(arc: Arc, entry_heading_rad: f64) -> Self {
        Self {
            prev: WaypointId(0),
            next: WaypointId(0),
            entry_heading_rad: wrap_2pi(entry_heading_rad),
            reversed: false,
            drive: DriveSettings::default(),
            arc,
        }
    }

    pub fn is_straight(&self) -> bool {
        self.arc.is_straight
    }

    /// Length along the segment.
    ///
    /// Units: inches
    pub fn arc_length_in(&self) -> f64 {
        self.arc.arc_length_in
    }

    /// Distance to drive, negative when reversed.
    ///
    /// Units: inches
    pub fn signed_distance_in(&self) -> f64 {
        if self.reversed {
            -self.arc.arc_length_in
        }
        else {
            self.arc.arc_length_in
        }
    }

    /// Radius of the segment, `None` if straight.
    pub fn radius_in(&self) -> Option<f64> {
        self.arc.center.map(|_| self.arc.radius_in)
    }

    /// Heading of the straight line between the end points.
    pub fn chord_heading_rad(&self) -> f64 {
        straight_heading(&self.arc.from, &self.arc.to)
    }

    /// Heading the robot faces when leaving `prev`.
    pub fn entry_facing_rad(&self) -> f64 {
        self.facing(self.arc.entry_heading_rad)
    }

    /// Heading the robot faces when arriving at `next`.
    pub fn exit_facing_rad(&self) -> f64 {
        self.facing(self.arc.exit_heading_rad)
    }

    /// Heading the robot should face at the end of the segment.
    pub fn goal_heading_rad(&self) -> f64 {
        self.exit_facing_rad()
    }

    fn facing(&self, travel_heading_rad: f64) -> f64 {
        if self.reversed {
            wrap_2pi(travel_heading_rad + PI)
        }
        else {
            travel_heading_rad
        }
    }
}
