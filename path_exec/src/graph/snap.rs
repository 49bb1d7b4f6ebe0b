//! Snapping of dragged headings and dragged waypoints
//!
//! Snapping only ever moves a candidate onto a nearby target. Passing
//! `snap = false` uses the candidate exactly as given.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::{Point2, Vector2};
use std::f64::consts::{FRAC_PI_2, PI};

// Internal
use super::*;
use crate::arc::{entry_heading_for_exit, straight_heading};
use util::maths::{heading_between, headings_eq, wrap_2pi};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathGraph {
    /// Set the entry heading of a segment.
    ///
    /// If `snap` is set the candidate snaps onto the first of these within
    /// the snap tolerance:
    ///
    /// 1. the segment's own chord heading (making it straight)
    /// 2. the previous segment's exit heading, then its reverse
    /// 3. the heading which makes this segment exit along the next segment's
    ///    entry heading, then its reverse
    ///
    /// Returns `Ok(false)`, leaving the segment unchanged, if the resulting
    /// arc is degenerate or longer than the maximum arc length.
    pub fn set_segment_heading(
        &mut self,
        segment: SegmentId,
        candidate_rad: f64,
        snap: bool
    ) -> Result<bool, PathGraphError> {
        self.check_segment(segment)?;

        let i = segment.0;
        let from = self.waypoints[i].position;
        let to = self.waypoints[i + 1].position;

        let candidate = wrap_2pi(candidate_rad);
        let heading = if snap {
            self.snap_segment_heading(segment, candidate)?
        }
        else {
            candidate
        };

        if !self.heading_acceptable(&from, &to, heading) {
            debug!("Rejected heading {:.4} for segment {:?}", heading, segment);
            return Ok(false);
        }

        self.segments[i].entry_heading_rad = heading;
        self.dirty = true;
        self.refresh();

        Ok(true)
    }

    /// Move a waypoint to a new position.
    ///
    /// If `snap` is set the position snaps onto rays from the neighbouring
    /// waypoints, see `snap_waypoint_position`. Straight segments either side
    /// of the waypoint stay straight.
    pub fn move_waypoint(
        &mut self,
        id: WaypointId,
        raw: Point2<f64>,
        snap: bool
    ) -> Result<(), PathGraphError> {
        self.check_waypoint(id)?;

        let i = id.0;
        let mut position = self.clamp_to_field(raw);
        if snap {
            position = self.clamp_to_field(self.snap_waypoint_position(id, position)?);
        }

        let prev = i.checked_sub(1).map(|p| self.waypoints[p].position);
        let next = self.waypoints.get(i + 1).map(|w| w.position);
        for n in prev.iter().chain(next.iter()) {
            if coincident(n, &position) {
                return Err(PathGraphError::CoincidentPoints(position.x, position.y));
            }
        }

        self.waypoints[i].position = position;

        if let Some(p) = prev {
            let seg = &mut self.segments[i - 1];
            if seg.is_straight() {
                seg.entry_heading_rad = straight_heading(&p, &position);
            }
        }
        if let Some(n) = next {
            let seg = &mut self.segments[i];
            if seg.is_straight() {
                seg.entry_heading_rad = straight_heading(&position, &n);
            }
        }

        debug!("Moved waypoint {:?} to ({:.2}, {:.2})", id, position.x, position.y);

        self.dirty = true;
        self.refresh();

        Ok(())
    }

    /// Snap a candidate segment heading onto the first matching target.
    pub fn snap_segment_heading(
        &self,
        segment: SegmentId,
        candidate_rad: f64
    ) -> Result<f64, PathGraphError> {
        self.check_segment(segment)?;

        let i = segment.0;
        let from = self.waypoints[i].position;
        let to = self.waypoints[i + 1].position;

        let mut targets = vec![straight_heading(&from, &to)];

        if let Some(prev) = i.checked_sub(1).map(|p| &self.segments[p]) {
            let exit = prev.arc.exit_heading_rad;
            targets.push(exit);
            targets.push(wrap_2pi(exit + PI));
        }

        if let Some(next) = self.segments.get(i + 1) {
            let entry = entry_heading_for_exit(&from, &to, next.arc.entry_heading_rad);
            targets.push(entry);
            targets.push(wrap_2pi(entry + PI));
        }

        Ok(targets
            .into_iter()
            .find(|t| headings_eq(*t, candidate_rad, self.params.snap_tolerance_rad))
            .unwrap_or(candidate_rad))
    }

    /// Snap a dragged waypoint position onto a ray from one of its neighbours.
    ///
    /// Rays are tried in this order, the previous neighbour before the next:
    ///
    /// 1. the extension of the straight segment on the far side of the
    ///    neighbour
    /// 2. the line from the neighbour towards its aim target
    /// 3. the four cardinal directions from the neighbour
    ///
    /// The point is projected onto the first ray whose heading is within the
    /// snap tolerance of the bearing from the neighbour to the point.
    pub fn snap_waypoint_position(
        &self,
        id: WaypointId,
        raw: Point2<f64>
    ) -> Result<Point2<f64>, PathGraphError> {
        self.check_waypoint(id)?;

        let i = id.0;
        let prev = i.checked_sub(1);
        let next = if i + 1 < self.waypoints.len() { Some(i + 1) } else { None };

        let mut rays: Vec<(Point2<f64>, f64)> = vec![];

        // Extension of the segment beyond the previous neighbour continues in
        // its direction of travel, beyond the next neighbour it runs back.
        if let Some(p) = prev {
            if let Some(seg) = p.checked_sub(1).map(|s| &self.segments[s]) {
                if seg.is_straight() {
                    rays.push((self.waypoints[p].position, seg.arc.exit_heading_rad));
                }
            }
        }
        if let Some(n) = next {
            if let Some(seg) = self.segments.get(n) {
                if seg.is_straight() {
                    rays.push((self.waypoints[n].position, wrap_2pi(seg.arc.entry_heading_rad + PI)));
                }
            }
        }

        for n in prev.iter().chain(next.iter()) {
            let wp = &self.waypoints[*n];
            if let Some(h) = wp.aim_heading_rad() {
                rays.push((wp.position, h));
            }
        }

        for n in prev.iter().chain(next.iter()) {
            for k in 0..4 {
                rays.push((self.waypoints[*n].position, k as f64 * FRAC_PI_2));
            }
        }

        for (anchor, heading) in rays {
            if coincident(&anchor, &raw) {
                continue;
            }

            let bearing = heading_between(anchor.x, anchor.y, raw.x, raw.y);
            if headings_eq(bearing, heading, self.params.snap_tolerance_rad) {
                let dir = Vector2::new(heading.cos(), heading.sin());
                return Ok(anchor + (raw - anchor).dot(&dir) * dir);
            }
        }

        Ok(raw)
    }
}
