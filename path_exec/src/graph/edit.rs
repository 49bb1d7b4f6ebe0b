//! Structural and settings edits on the path graph
//!
//! Structural edits (append, insert, delete) relink the chain and recompute
//! immediately. Settings edits mark the graph dirty and then drain it with a
//! single refresh.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Point2;

// Internal
use super::*;
use crate::arc::straight_heading;
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathGraph {
    /// Add a new waypoint at the end of the chain, connected by a new segment.
    ///
    /// The new segment continues smoothly from the previous one if the
    /// resulting arc is acceptable, otherwise it is straight. The first
    /// segment of a path is always straight, and the start heading is aimed
    /// along it.
    pub fn append_waypoint(&mut self, position: Point2<f64>) -> Result<WaypointId, PathGraphError> {
        let position = self.clamp_to_field(position);
        let tail = self.waypoints[self.waypoints.len() - 1].position;

        if coincident(&tail, &position) {
            return Err(PathGraphError::CoincidentPoints(position.x, position.y));
        }

        let chord = straight_heading(&tail, &position);

        let entry = match self.segments.last() {
            None => {
                self.waypoints[0].kind = WaypointKind::Start { heading_rad: chord };
                chord
            }
            Some(prev) => self.entry_or_chord(&tail, &position, prev.arc.exit_heading_rad),
        };

        self.waypoints.push(Waypoint::new_turn(position));
        self.segments.push(Segment::new(Arc::straight(tail, position), entry));
        self.relink();
        self.recompute();

        let id = self.tail_id();
        debug!("Appended waypoint {:?} at ({:.2}, {:.2})", id, position.x, position.y);

        Ok(id)
    }

    /// Split a segment in two by inserting a new waypoint at `position`.
    ///
    /// A straight segment becomes two straight segments. A curved segment
    /// keeps its entry heading on the first half, and the second half enters
    /// where the first half exits. A half whose arc would fail the arc length
    /// guard is made straight instead. Both halves keep the drive settings of
    /// the original.
    pub fn insert_waypoint(
        &mut self,
        segment: SegmentId,
        position: Point2<f64>
    ) -> Result<WaypointId, PathGraphError> {
        self.check_segment(segment)?;

        let i = segment.0;
        let position = self.clamp_to_field(position);
        let from = self.waypoints[i].position;
        let to = self.waypoints[i + 1].position;

        if coincident(&from, &position) || coincident(&to, &position) {
            return Err(PathGraphError::CoincidentPoints(position.x, position.y));
        }

        let original = self.segments[i].clone();

        let (first_entry, second_entry) = if original.is_straight() {
            (straight_heading(&from, &position), straight_heading(&position, &to))
        }
        else {
            let first_entry = self.entry_or_chord(&from, &position, original.entry_heading_rad);
            let continued = self.arc_between(&from, &position, first_entry).exit_heading_rad;
            (first_entry, self.entry_or_chord(&position, &to, continued))
        };

        let mut first = original.clone();
        first.entry_heading_rad = first_entry;

        let mut second = original;
        second.entry_heading_rad = second_entry;

        self.segments[i] = first;
        self.segments.insert(i + 1, second);
        self.waypoints.insert(i + 1, Waypoint::new_turn(position));
        self.relink();
        self.recompute();

        debug!("Inserted waypoint {:?} into segment {:?}", WaypointId(i + 1), segment);

        Ok(WaypointId(i + 1))
    }

    /// Remove a waypoint from the chain.
    ///
    /// Removing the tail also removes its incoming segment. Removing an
    /// interior waypoint joins its neighbours with the incoming segment, which
    /// keeps its settings. If that segment was straight it stays straight on
    /// the new chord.
    pub fn delete_waypoint(&mut self, id: WaypointId) -> Result<(), PathGraphError> {
        self.check_waypoint(id)?;

        let i = id.0;
        if i == 0 {
            return Err(PathGraphError::StartProtected);
        }

        if i == self.waypoints.len() - 1 {
            self.waypoints.remove(i);
            self.segments.remove(i - 1);
        }
        else {
            let was_straight = self.segments[i - 1].is_straight();

            self.waypoints.remove(i);
            self.segments.remove(i);

            if was_straight {
                let from = self.waypoints[i - 1].position;
                let to = self.waypoints[i].position;
                self.segments[i - 1].entry_heading_rad = straight_heading(&from, &to);
            }
        }

        self.relink();
        self.recompute();

        debug!("Deleted waypoint {:?}", id);

        Ok(())
    }

    /// Set whether the robot drives the segment backwards.
    pub fn set_reversed(&mut self, segment: SegmentId, reversed: bool) -> Result<(), PathGraphError> {
        self.check_segment(segment)?;

        self.segments[segment.0].reversed = reversed;
        self.dirty = true;
        self.refresh();

        Ok(())
    }

    pub fn set_drive_mode(&mut self, segment: SegmentId, mode: DriveMode) -> Result<(), PathGraphError> {
        self.check_segment(segment)?;

        self.segments[segment.0].drive.mode = mode;
        self.dirty = true;
        self.refresh();

        Ok(())
    }

    /// Set the fraction of maximum speed used on the segment. The value is
    /// clamped into `[0.05, 1]`.
    pub fn set_speed_fraction(&mut self, segment: SegmentId, fraction: f64) -> Result<(), PathGraphError> {
        self.check_segment(segment)?;

        self.segments[segment.0].drive.speed_fraction = fraction.max(0.05).min(1.0);
        self.dirty = true;
        self.refresh();

        Ok(())
    }

    pub fn set_turn_mode(&mut self, id: WaypointId, mode: TurnMode) -> Result<(), PathGraphError> {
        self.check_waypoint(id)?;

        match &mut self.waypoints[id.0].kind {
            WaypointKind::Turn { turn_mode, .. } => *turn_mode = mode,
            WaypointKind::Start { .. } => return Err(PathGraphError::NotATurnWaypoint(id)),
        }

        self.dirty = true;
        self.refresh();

        Ok(())
    }

    /// Set or clear the aim override of a waypoint.
    pub fn set_aim(
        &mut self,
        id: WaypointId,
        new_aim: Option<AimOverride>
    ) -> Result<(), PathGraphError> {
        self.check_waypoint(id)?;

        match &mut self.waypoints[id.0].kind {
            WaypointKind::Turn { aim, .. } => *aim = new_aim,
            WaypointKind::Start { .. } => return Err(PathGraphError::NotATurnWaypoint(id)),
        }

        self.dirty = true;
        self.refresh();

        Ok(())
    }

    /// Set how long the robot stands still after arriving at a waypoint.
    /// Negative times are treated as zero.
    pub fn set_wait(&mut self, id: WaypointId, wait_s: f64) -> Result<(), PathGraphError> {
        self.check_waypoint(id)?;

        match &mut self.waypoints[id.0].kind {
            WaypointKind::Turn { wait_s: w, .. } => *w = wait_s.max(0.0),
            WaypointKind::Start { .. } => return Err(PathGraphError::NotATurnWaypoint(id)),
        }

        self.dirty = true;
        self.refresh();

        Ok(())
    }

    /// Set the heading the robot is placed at on the start waypoint.
    pub fn set_start_heading(&mut self, heading_rad: f64) {
        self.waypoints[0].kind = WaypointKind::Start {
            heading_rad: wrap_2pi(heading_rad),
        };
        self.dirty = true;
        self.refresh();
    }

    /// True if an arc from `from` to `to` with the given entry heading passes
    /// the arc length guard.
    pub(crate) fn heading_acceptable(&self, from: &Point2<f64>, to: &Point2<f64>, heading_rad: f64) -> bool {
        let arc = self.arc_between(from, to, heading_rad);
        !arc.is_degenerate && arc.arc_length_in <= self.params.max_arc_length_in
    }

    /// The given entry heading if it passes the arc length guard, otherwise
    /// the chord heading.
    fn entry_or_chord(&self, from: &Point2<f64>, to: &Point2<f64>, heading_rad: f64) -> f64 {
        if self.heading_acceptable(from, to, heading_rad) {
            heading_rad
        }
        else {
            straight_heading(from, to)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn graph() -> PathGraph {
        PathGraph::new(GraphParams::default())
    }

    #[test]
    fn test_first_append_is_straight_and_aims_start() {
        let mut g = graph();
        g.append_waypoint(Point2::new(24.0, 96.0)).unwrap();

        assert!(g.segments()[0].is_straight());
        assert_abs_diff_eq!(g.start().start_heading_rad().unwrap(), FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(g.start().turn, TurnDirection::None);
        assert_eq!(g.waypoints()[1].turn, TurnDirection::None);
        g.check_links().unwrap();
    }

    #[test]
    fn test_append_continues_previous_exit() {
        let mut g = graph();
        g.append_waypoint(Point2::new(60.0, 48.0)).unwrap();
        g.append_waypoint(Point2::new(90.0, 78.0)).unwrap();

        // Tangent continuation of a straight segment heading +X
        let seg = &g.segments()[1];
        assert!(!seg.is_straight());
        assert_abs_diff_eq!(seg.entry_heading_rad, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seg.arc.exit_heading_rad, FRAC_PI_2, epsilon = 1e-9);
        assert_eq!(g.waypoints()[1].turn, TurnDirection::None);
    }

    #[test]
    fn test_append_falls_back_to_chord_when_guard_rejects() {
        let mut g = graph();
        g.append_waypoint(Point2::new(60.0, 48.0)).unwrap();

        // Continuing along +X to a point directly behind is degenerate
        g.append_waypoint(Point2::new(30.0, 48.0)).unwrap();
        let seg = &g.segments()[1];
        assert!(seg.is_straight());
        assert_abs_diff_eq!(seg.entry_heading_rad, PI, epsilon = 1e-12);
        assert_eq!(g.waypoints()[1].turn, TurnDirection::Left);
    }

    #[test]
    fn test_append_rejects_coincident() {
        let mut g = graph();
        assert!(matches!(
            g.append_waypoint(Point2::new(24.0, 48.0)),
            Err(PathGraphError::CoincidentPoints(_, _))
        ));
        assert_eq!(g.num_waypoints(), 1);
    }

    #[test]
    fn test_insert_into_straight() {
        let mut g = graph();
        g.append_waypoint(Point2::new(72.0, 48.0)).unwrap();

        let id = g.insert_waypoint(SegmentId(0), Point2::new(48.0, 60.0)).unwrap();
        assert_eq!(id, WaypointId(1));
        assert_eq!(g.num_segments(), 2);
        assert!(g.segments().iter().all(|s| s.is_straight()));
        assert_eq!(g.waypoints()[1].turn, TurnDirection::Right);
        g.check_links().unwrap();
    }

    #[test]
    fn test_insert_into_curve_keeps_continuity() {
        let mut g = graph();
        g.append_waypoint(Point2::new(60.0, 48.0)).unwrap();
        g.append_waypoint(Point2::new(90.0, 78.0)).unwrap();

        // Point on the quarter circle about (60, 78)
        let ang = -FRAC_PI_2 + 0.6;
        let p = Point2::new(60.0 + 30.0 * ang.cos(), 78.0 + 30.0 * ang.sin());
        g.insert_waypoint(SegmentId(1), p).unwrap();

        let first = &g.segments()[1];
        let second = &g.segments()[2];
        assert!(!first.is_straight());
        assert_abs_diff_eq!(first.arc.exit_heading_rad, second.arc.entry_heading_rad, epsilon = 1e-9);
        assert_eq!(g.waypoints()[2].turn, TurnDirection::None);
        assert_abs_diff_eq!(second.arc.exit_heading_rad, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_insert_behind_curve_respects_guard() {
        let mut g = graph();
        g.append_waypoint(Point2::new(72.0, 48.0)).unwrap();
        g.append_waypoint(Point2::new(102.0, 78.0)).unwrap();
        assert!(!g.segments()[1].is_straight());

        // Just behind the start of the curve, so keeping its entry heading
        // would loop almost a full circle
        g.insert_waypoint(SegmentId(1), Point2::new(60.0, 48.5)).unwrap();

        let max = g.params().max_arc_length_in;
        for seg in g.segments() {
            assert!(!seg.arc.is_degenerate);
            assert!(seg.arc_length_in() <= max);
        }
        assert!(g.segments()[1].is_straight());
        g.check_links().unwrap();
    }

    #[test]
    fn test_delete() {
        let mut g = graph();
        g.append_waypoint(Point2::new(60.0, 48.0)).unwrap();
        g.append_waypoint(Point2::new(60.0, 90.0)).unwrap();
        g.append_waypoint(Point2::new(100.0, 90.0)).unwrap();

        assert_eq!(g.delete_waypoint(WaypointId(0)), Err(PathGraphError::StartProtected));
        assert_eq!(
            g.delete_waypoint(WaypointId(9)),
            Err(PathGraphError::UnknownWaypoint(WaypointId(9)))
        );

        // Tail
        g.delete_waypoint(WaypointId(3)).unwrap();
        assert_eq!(g.num_waypoints(), 3);
        assert_eq!(g.num_segments(), 2);
        g.check_links().unwrap();

        // Interior
        g.delete_waypoint(WaypointId(1)).unwrap();
        assert_eq!(g.num_segments(), 1);
        let seg = &g.segments()[0];
        assert!(seg.is_straight());
        assert_abs_diff_eq!(
            seg.entry_heading_rad,
            straight_heading(&Point2::new(24.0, 48.0), &Point2::new(60.0, 90.0)),
            epsilon = 1e-12
        );
        g.check_links().unwrap();
    }

    #[test]
    fn test_settings_edits() {
        let mut g = graph();
        g.append_waypoint(Point2::new(72.0, 48.0)).unwrap();
        g.append_waypoint(Point2::new(100.0, 48.0)).unwrap();

        g.set_reversed(SegmentId(1), true).unwrap();
        assert!(!g.is_dirty());
        assert_eq!(g.segments()[1].signed_distance_in(), -28.0);
        assert_ne!(g.waypoints()[1].turn, TurnDirection::None);

        g.set_drive_mode(SegmentId(0), DriveMode::Timed { time_s: 1.5 }).unwrap();
        assert_eq!(g.segments()[0].drive.mode, DriveMode::Timed { time_s: 1.5 });

        g.set_speed_fraction(SegmentId(0), 3.0).unwrap();
        assert_eq!(g.segments()[0].drive.speed_fraction, 1.0);

        g.set_turn_mode(WaypointId(1), TurnMode::Fast).unwrap();
        assert_eq!(g.waypoints()[1].turn_mode(), TurnMode::Fast);

        let aim = AimOverride {
            target: Point2::new(72.0, 100.0),
            heading_correction_rad: 0.0,
        };
        assert_eq!(
            g.set_aim(WaypointId(0), Some(aim)),
            Err(PathGraphError::NotATurnWaypoint(WaypointId(0)))
        );
        g.set_aim(WaypointId(1), Some(aim)).unwrap();
        assert_abs_diff_eq!(g.waypoints()[1].aim_heading_rad().unwrap(), FRAC_PI_2, epsilon = 1e-12);

        g.set_wait(WaypointId(1), -2.0).unwrap();
        assert_eq!(g.waypoints()[1].wait_s(), 0.0);
        g.set_wait(WaypointId(2), 0.75).unwrap();
        assert_eq!(g.waypoints()[2].wait_s(), 0.75);
        assert_eq!(
            g.set_wait(WaypointId(0), 1.0),
            Err(PathGraphError::NotATurnWaypoint(WaypointId(0)))
        );

        assert_eq!(
            g.set_reversed(SegmentId(5), true),
            Err(PathGraphError::UnknownSegment(SegmentId(5)))
        );
    }

    #[test]
    fn test_start_heading_turn() {
        let mut g = graph();
        g.append_waypoint(Point2::new(72.0, 48.0)).unwrap();

        g.set_start_heading(FRAC_PI_2);
        assert_eq!(g.start().turn, TurnDirection::Right);

        g.set_start_heading(-FRAC_PI_2);
        assert_eq!(g.start().turn, TurnDirection::Left);
    }
}
