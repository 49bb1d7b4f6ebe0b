//! Path records
//!
//! A record holds only the user's inputs to a path. Everything derived is
//! rebuilt by recompute when the record is loaded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The minimal set of parameters describing a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub start_position_in: [f64; 2],

    pub start_heading_rad: f64,

    /// One entry per segment, in path order
    pub segments: Vec<SegmentRecord>,
}

/// A segment and the waypoint it arrives at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(default)]
    pub reversed: bool,

    pub entry_heading_rad: f64,

    #[serde(default)]
    pub drive: DriveSettings,

    pub end_position_in: [f64; 2],

    #[serde(default)]
    pub turn_mode: TurnMode,

    #[serde(default)]
    pub aim: Option<AimOverride>,

    /// Time to stand still at the end position
    #[serde(default)]
    pub wait_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathGraph {
    /// Build a graph from a record.
    ///
    /// Positions are clamped into the field. Consecutive coincident positions
    /// are rejected.
    pub fn load(record: &PathRecord, params: GraphParams) -> Result<Self, PathGraphError> {
        let mut graph = Self::new(params);

        let start = graph.clamp_to_field(to_point(record.start_position_in));
        graph.waypoints[0] = Waypoint::new_start(start, record.start_heading_rad);

        for s in record.segments.iter() {
            let from = graph.waypoints[graph.waypoints.len() - 1].position;
            let to = graph.clamp_to_field(to_point(s.end_position_in));

            if coincident(&from, &to) {
                return Err(PathGraphError::CoincidentPoints(to.x, to.y));
            }

            let mut seg = Segment::new(Arc::straight(from, to), s.entry_heading_rad);
            seg.reversed = s.reversed;
            seg.drive = s.drive;

            let mut wp = Waypoint::new_turn(to);
            wp.kind = WaypointKind::Turn {
                aim: s.aim,
                turn_mode: s.turn_mode,
                wait_s: s.wait_s.max(0.0),
            };

            graph.segments.push(seg);
            graph.waypoints.push(wp);
        }

        graph.relink();
        graph.check_links()?;
        graph.recompute();

        info!(
            "Loaded path with {} waypoints and {} segments",
            graph.num_waypoints(),
            graph.num_segments()
        );

        Ok(graph)
    }

    /// Extract the record describing this graph.
    pub fn to_record(&self) -> PathRecord {
        let start = self.start();

        PathRecord {
            start_position_in: [start.position.x, start.position.y],
            start_heading_rad: start.start_heading_rad().unwrap_or(0.0),
            segments: self
                .segments
                .iter()
                .map(|seg| {
                    let wp = &self.waypoints[seg.next.0];
                    SegmentRecord {
                        reversed: seg.reversed,
                        entry_heading_rad: wrap_2pi(seg.entry_heading_rad),
                        drive: seg.drive,
                        end_position_in: [wp.position.x, wp.position.y],
                        turn_mode: wp.turn_mode(),
                        aim: wp.aim().copied(),
                        wait_s: wp.wait_s(),
                    }
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn to_point(p: [f64; 2]) -> Point2<f64> {
    Point2::new(p[0], p[1])
}
