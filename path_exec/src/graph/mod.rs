//! # Path graph module
//!
//! The path graph is an alternating chain of waypoints and segments, headed by
//! the single start waypoint:
//!
//! ```text
//! W0 (start) -- S0 -- W1 -- S1 -- W2 ... Wn
//! ```
//!
//! Segment `i` always joins waypoint `i` to waypoint `i + 1`, so both are
//! stored in plain vectors and addressed by typed indices. After any
//! structural edit the cross links are rewritten by `relink` and every derived
//! quantity is rebuilt by `recompute`.
//!
//! Recompute runs in two passes which must not be reordered:
//!
//! 1. Every segment's arc is resolved from its own entry heading and the
//!    positions of its two waypoints.
//! 2. Every waypoint's turn is classified by comparing the heading the robot
//!    faces on arrival with the heading it must face on departure. This reads
//!    the arcs of both adjacent segments, so all arcs must be current first.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod edit;
mod params;
mod record;
mod segment;
mod snap;
mod waypoint;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Point2;
use thiserror::Error;

// Internal
use crate::arc::{compute_arc_with_tolerance, is_touching, Arc};
use util::maths::get_ang_dist_2pi;

pub use params::GraphParams;
pub use record::{PathRecord, SegmentRecord};
pub use segment::{DriveMode, DriveSettings, Segment, SegmentId};
pub use waypoint::{AimOverride, TurnDirection, TurnMode, Waypoint, WaypointId, WaypointKind};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Points closer than this are considered coincident.
///
/// Units: inches
pub const COINCIDENT_TOL_IN: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The chain of waypoints and segments making up a path.
#[derive(Debug, Clone)]
pub struct PathGraph {
    params: GraphParams,

    waypoints: Vec<Waypoint>,

    segments: Vec<Segment>,

    /// Set by settings edits, drained by `refresh`
    dirty: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur when editing the path graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathGraphError {
    #[error("The start waypoint cannot be deleted")]
    StartProtected,

    #[error("No waypoint with id {0:?} exists")]
    UnknownWaypoint(WaypointId),

    #[error("No segment with id {0:?} exists")]
    UnknownSegment(SegmentId),

    #[error("The point ({0}, {1}) coincides with a neighbouring waypoint")]
    CoincidentPoints(f64, f64),

    #[error("Waypoint {0:?} is the start and has no turn settings")]
    NotATurnWaypoint(WaypointId),

    #[error("The chain links are inconsistent: {0}")]
    BrokenLinks(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathGraph {
    /// Create a new graph holding only the start waypoint at the default
    /// start pose.
    pub fn new(params: GraphParams) -> Self {
        let start = Point2::new(params.start_position_in[0], params.start_position_in[1]);
        let heading = params.start_heading_rad;

        let mut graph = Self {
            waypoints: vec![],
            segments: vec![],
            dirty: false,
            params,
        };

        let start = graph.clamp_to_field(start);
        graph.waypoints.push(Waypoint::new_start(start, heading));
        graph.relink();
        graph.recompute();

        graph
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(id.0)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0)
    }

    /// The start waypoint, which is always the head of the chain.
    pub fn start(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn tail_id(&self) -> WaypointId {
        WaypointId(self.waypoints.len() - 1)
    }

    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute the graph if a settings edit has marked it dirty.
    pub fn refresh(&mut self) {
        if self.dirty {
            self.recompute();
        }
    }

    /// Rebuild every derived quantity in the graph.
    pub fn recompute(&mut self) {
        let tol = self.params.heading_tolerance_rad;

        // Pass 1: segment geometry
        for i in 0..self.segments.len() {
            let from = self.waypoints[i].position;
            let to = self.waypoints[i + 1].position;
            let seg = &mut self.segments[i];

            let arc = compute_arc_with_tolerance(from, to, seg.entry_heading_rad, tol);
            seg.arc = if arc.is_degenerate {
                debug!("Segment {} is degenerate, treating as straight", i);
                Arc::straight(from, to)
            }
            else {
                arc
            };
        }

        // Pass 2: turn classification, which reads the arcs from pass 1
        for i in 0..self.waypoints.len() {
            let arrive = match self.waypoints[i].start_heading_rad() {
                Some(h) => h,
                None => self.segments[i - 1].exit_facing_rad(),
            };

            let turn = match self.segments.get(i) {
                Some(seg) => classify_turn(arrive, seg.entry_facing_rad(), tol),
                None => TurnDirection::None,
            };

            self.waypoints[i].turn = turn;
        }

        self.dirty = false;

        trace!(
            "Recomputed graph with {} waypoints and {} segments",
            self.waypoints.len(),
            self.segments.len()
        );
    }

    /// Rewrite all cross links from the positions in the vectors.
    pub(crate) fn relink(&mut self) {
        let num_segs = self.segments.len();

        for (i, wp) in self.waypoints.iter_mut().enumerate() {
            wp.incoming = if i > 0 { Some(SegmentId(i - 1)) } else { None };
            wp.outgoing = if i < num_segs { Some(SegmentId(i)) } else { None };
        }

        for (i, seg) in self.segments.iter_mut().enumerate() {
            seg.prev = WaypointId(i);
            seg.next = WaypointId(i + 1);
        }
    }

    /// Verify that the chain structure and its cross links are consistent.
    pub fn check_links(&self) -> Result<(), PathGraphError> {
        if self.waypoints.len() != self.segments.len() + 1 {
            return Err(PathGraphError::BrokenLinks(format!(
                "{} waypoints but {} segments",
                self.waypoints.len(),
                self.segments.len()
            )));
        }

        for (i, wp) in self.waypoints.iter().enumerate() {
            if wp.is_start() != (i == 0) {
                return Err(PathGraphError::BrokenLinks(format!(
                    "waypoint {} has the wrong kind",
                    i
                )));
            }

            if let Some(s) = wp.incoming {
                if self.segments.get(s.0).map(|seg| seg.next) != Some(WaypointId(i)) {
                    return Err(PathGraphError::BrokenLinks(format!(
                        "incoming segment of waypoint {} does not point back to it",
                        i
                    )));
                }
            }
            else if i != 0 {
                return Err(PathGraphError::BrokenLinks(format!(
                    "waypoint {} has no incoming segment",
                    i
                )));
            }

            if let Some(s) = wp.outgoing {
                if self.segments.get(s.0).map(|seg| seg.prev) != Some(WaypointId(i)) {
                    return Err(PathGraphError::BrokenLinks(format!(
                        "outgoing segment of waypoint {} does not point back to it",
                        i
                    )));
                }
            }
            else if i != self.waypoints.len() - 1 {
                return Err(PathGraphError::BrokenLinks(format!(
                    "waypoint {} has no outgoing segment",
                    i
                )));
            }
        }

        for (i, seg) in self.segments.iter().enumerate() {
            let prev_ok = self.waypoints.get(seg.prev.0).and_then(|w| w.outgoing)
                == Some(SegmentId(i));
            let next_ok = self.waypoints.get(seg.next.0).and_then(|w| w.incoming)
                == Some(SegmentId(i));

            if !prev_ok || !next_ok {
                return Err(PathGraphError::BrokenLinks(format!(
                    "segment {} is not linked to its waypoints",
                    i
                )));
            }
        }

        Ok(())
    }

    /// Find the first segment touching the given point.
    pub fn segment_at(&self, point: &Point2<f64>) -> Option<SegmentId> {
        self.segments
            .iter()
            .position(|s| is_touching(&s.arc, point, self.params.hit_tolerance_in))
            .map(SegmentId)
    }

    /// Find the waypoint nearest to the given point, if any is within the hit
    /// tolerance.
    pub fn waypoint_at(&self, point: &Point2<f64>) -> Option<WaypointId> {
        self.waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| (i, (w.position - point).norm()))
            .filter(|(_, d)| *d <= self.params.hit_tolerance_in)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| WaypointId(i))
    }

    pub(crate) fn clamp_to_field(&self, point: Point2<f64>) -> Point2<f64> {
        let max = self.params.field_size_in;
        Point2::new(point.x.max(0.0).min(max), point.y.max(0.0).min(max))
    }

    pub(crate) fn check_waypoint(&self, id: WaypointId) -> Result<(), PathGraphError> {
        if id.0 < self.waypoints.len() {
            Ok(())
        }
        else {
            Err(PathGraphError::UnknownWaypoint(id))
        }
    }

    pub(crate) fn check_segment(&self, id: SegmentId) -> Result<(), PathGraphError> {
        if id.0 < self.segments.len() {
            Ok(())
        }
        else {
            Err(PathGraphError::UnknownSegment(id))
        }
    }

    /// Arc between two points, straight within the graph's heading tolerance.
    pub(crate) fn arc_between(&self, from: &Point2<f64>, to: &Point2<f64>, heading_rad: f64) -> Arc {
        compute_arc_with_tolerance(*from, *to, heading_rad, self.params.heading_tolerance_rad)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Classify the on-the-spot turn needed to go from facing `arrive_rad` to
/// facing `depart_rad`.
pub fn classify_turn(arrive_rad: f64, depart_rad: f64, tolerance_rad: f64) -> TurnDirection {
    let delta = get_ang_dist_2pi(arrive_rad, depart_rad);

    if delta.abs() <= tolerance_rad {
        TurnDirection::None
    }
    else if delta > 0.0 {
        TurnDirection::Left
    }
    else {
        TurnDirection::Right
    }
}

/// True if the points are close enough to be considered the same.
pub(crate) fn coincident(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    (a - b).norm() < COINCIDENT_TOL_IN
}
