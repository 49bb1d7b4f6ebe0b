//! # Path graph scenario tests
//!
//! Exercise the graph through its public editing operations only.

use approx::assert_abs_diff_eq;
use nalgebra::Point2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::FRAC_PI_2;

use path_lib::arc::straight_heading;
use path_lib::graph::{
    DriveMode, GraphParams, PathGraph, PathGraphError, PathRecord, SegmentId, TurnDirection,
    WaypointId,
};

fn random_point(rng: &mut StdRng) -> Point2<f64> {
    Point2::new(rng.gen_range(0.0..144.0), rng.gen_range(0.0..144.0))
}

/// Check the structure of the chain and that recomputing again changes
/// nothing.
fn assert_consistent(graph: &PathGraph) {
    graph.check_links().unwrap();
    assert_eq!(graph.num_waypoints(), graph.num_segments() + 1);
    assert!(graph.start().is_start());
    assert!(!graph.is_dirty());

    for (i, seg) in graph.segments().iter().enumerate() {
        assert_eq!(seg.prev, WaypointId(i));
        assert_eq!(seg.next, WaypointId(i + 1));
        assert_eq!(seg.arc.from, graph.waypoints()[i].position);
        assert_eq!(seg.arc.to, graph.waypoints()[i + 1].position);
        assert!(seg.arc_length_in().is_finite());
    }

    let mut again = graph.clone();
    again.recompute();
    assert_eq!(again.segments(), graph.segments());
    assert_eq!(again.waypoints(), graph.waypoints());
}

#[test]
fn random_edits_keep_chain_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut graph = PathGraph::new(GraphParams::default());

    for _ in 0..500 {
        let num_segs = graph.num_segments();
        let op = rng.gen_range(0..6);

        let result = match op {
            0 => graph.append_waypoint(random_point(&mut rng)).map(|_| ()),
            1 if num_segs > 0 => {
                let s = SegmentId(rng.gen_range(0..num_segs));
                graph.insert_waypoint(s, random_point(&mut rng)).map(|_| ())
            }
            2 if num_segs > 0 => {
                let w = WaypointId(rng.gen_range(1..graph.num_waypoints()));
                graph.delete_waypoint(w)
            }
            3 => {
                let w = WaypointId(rng.gen_range(0..graph.num_waypoints()));
                let snap = rng.gen_bool(0.5);
                graph.move_waypoint(w, random_point(&mut rng), snap)
            }
            4 if num_segs > 0 => {
                let s = SegmentId(rng.gen_range(0..num_segs));
                let snap = rng.gen_bool(0.5);
                graph
                    .set_segment_heading(s, rng.gen_range(0.0..std::f64::consts::TAU), snap)
                    .map(|_| ())
            }
            5 if num_segs > 0 => {
                let s = SegmentId(rng.gen_range(0..num_segs));
                graph.set_reversed(s, rng.gen_bool(0.5))
            }
            _ => Ok(()),
        };

        match result {
            Ok(()) | Err(PathGraphError::CoincidentPoints(_, _)) => (),
            Err(e) => panic!("Unexpected edit error: {}", e),
        }

        assert_consistent(&graph);
    }
}

#[test]
fn two_waypoint_straight_has_no_turns() {
    let mut graph = PathGraph::new(GraphParams::default());
    graph.append_waypoint(Point2::new(90.0, 100.0)).unwrap();

    assert_eq!(graph.num_segments(), 1);
    let seg = &graph.segments()[0];
    assert!(seg.is_straight());
    assert_abs_diff_eq!(
        seg.arc_length_in(),
        (Point2::new(90.0, 100.0) - Point2::new(24.0, 48.0)).norm(),
        epsilon = 1e-9
    );

    for wp in graph.waypoints() {
        assert_eq!(wp.turn, TurnDirection::None);
    }
}

#[test]
fn deleting_interior_waypoint_merges_straights() {
    let mut graph = PathGraph::new(GraphParams::default());
    graph.append_waypoint(Point2::new(72.0, 48.0)).unwrap();
    graph.append_waypoint(Point2::new(100.0, 90.0)).unwrap();

    let chord = graph.segments()[1].chord_heading_rad();
    assert!(graph.set_segment_heading(SegmentId(1), chord, false).unwrap());
    assert!(graph.segments().iter().all(|s| s.is_straight()));
    assert_eq!(graph.waypoints()[1].turn, TurnDirection::Left);

    graph.delete_waypoint(WaypointId(1)).unwrap();

    assert_eq!(graph.num_waypoints(), 2);
    let seg = &graph.segments()[0];
    assert!(seg.is_straight());
    assert_abs_diff_eq!(
        seg.entry_heading_rad,
        straight_heading(&Point2::new(24.0, 48.0), &Point2::new(100.0, 90.0)),
        epsilon = 1e-12
    );
    assert_consistent(&graph);
}

#[test]
fn start_is_protected() {
    let mut graph = PathGraph::new(GraphParams::default());
    graph.append_waypoint(Point2::new(72.0, 48.0)).unwrap();

    assert_eq!(graph.delete_waypoint(WaypointId(0)), Err(PathGraphError::StartProtected));
    assert_eq!(
        graph.delete_waypoint(WaypointId(5)),
        Err(PathGraphError::UnknownWaypoint(WaypointId(5)))
    );
    assert_eq!(graph.num_waypoints(), 2);
}

#[test]
fn smooth_append_then_turn_on_heading_change() {
    let mut graph = PathGraph::new(GraphParams::default());
    graph.append_waypoint(Point2::new(72.0, 48.0)).unwrap();

    // Continues smoothly into a quarter circle
    graph.append_waypoint(Point2::new(102.0, 78.0)).unwrap();
    let curve = &graph.segments()[1];
    assert!(!curve.is_straight());
    assert_abs_diff_eq!(curve.radius_in().unwrap(), 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(curve.arc.exit_heading_rad, FRAC_PI_2, epsilon = 1e-9);
    assert_eq!(graph.waypoints()[1].turn, TurnDirection::None);

    // Straightening the curve leaves a left turn at the joint
    let chord = curve.chord_heading_rad();
    graph.set_segment_heading(SegmentId(1), chord, false).unwrap();
    assert_eq!(graph.waypoints()[1].turn, TurnDirection::Left);

    // Reversing the second segment means facing backwards along it
    graph.set_reversed(SegmentId(1), true).unwrap();
    assert_eq!(graph.waypoints()[1].turn, TurnDirection::Right);
}

#[test]
fn record_survives_json() {
    let mut graph = PathGraph::new(GraphParams::default());
    graph.append_waypoint(Point2::new(72.0, 48.0)).unwrap();
    graph.append_waypoint(Point2::new(102.0, 78.0)).unwrap();
    graph.append_waypoint(Point2::new(60.0, 120.0)).unwrap();
    graph.set_drive_mode(SegmentId(2), DriveMode::Fast).unwrap();

    let json = serde_json::to_string_pretty(&graph.to_record()).unwrap();
    let record: PathRecord = serde_json::from_str(&json).unwrap();
    let loaded = PathGraph::load(&record, GraphParams::default()).unwrap();

    assert_eq!(loaded.segments(), graph.segments());
    assert_eq!(loaded.waypoints(), graph.waypoints());
}
