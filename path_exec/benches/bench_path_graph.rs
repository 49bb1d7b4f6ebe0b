//! # Path Graph Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::Point2;
use path_lib::graph::{GraphParams, PathGraph, SegmentId};

/// Build a path zig-zagging across the field, with every other segment
/// curved.
fn zig_zag(num_waypoints: usize) -> PathGraph {
    let mut graph = PathGraph::new(GraphParams::default());

    for i in 0..num_waypoints {
        let x = 24.0 + 96.0 * (i as f64 / num_waypoints as f64);
        let y = if i % 2 == 0 { 100.0 } else { 40.0 };
        graph.append_waypoint(Point2::new(x, y)).unwrap();
    }

    for i in (0..graph.num_segments()).step_by(2) {
        let chord = graph.segments()[i].chord_heading_rad();
        graph.set_segment_heading(SegmentId(i), chord, false).unwrap();
    }

    graph
}

fn path_graph_benchmark(c: &mut Criterion) {
    let mut graph = zig_zag(40);
    let record = graph.to_record();

    c.bench_function("PathGraph::recompute", |b| b.iter(|| graph.recompute()));

    c.bench_function("PathGraph::load", |b| {
        b.iter(|| PathGraph::load(&record, GraphParams::default()).unwrap())
    });

    c.bench_function("PathGraph::insert_delete", |b| {
        b.iter(|| {
            let id = graph.insert_waypoint(SegmentId(10), Point2::new(70.0, 72.0)).unwrap();
            graph.delete_waypoint(id).unwrap();
        })
    });
}

criterion_group!(benches, path_graph_benchmark);
criterion_main!(benches);
