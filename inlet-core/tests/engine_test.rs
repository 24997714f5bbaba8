//! End-to-end tests over a small synthetic feed: three stops on one route,
//! departures every 10 minutes through the morning window.

use geo::Point;
use inlet_core::prelude::*;
use petgraph::visit::EdgeRef;

fn feed_fixture() -> GtfsFeed {
    use polars::prelude::*;

    // A (49.2800), B (49.2845), C (49.2890) along lon -123.12; roughly
    // 500 m between neighbours. Shape S runs through two midpoints.
    let trips_r1: Vec<String> = (0..6).map(|i| format!("t{i}")).collect();
    let trips_r2: Vec<String> = (0..6).map(|i| format!("s{i}")).collect();

    let mut trip_id = Vec::new();
    let mut arrival = Vec::new();
    let mut stop_id = Vec::new();
    let mut sequence = Vec::new();
    let mut dist = Vec::new();

    for (i, trip) in trips_r1.iter().enumerate() {
        let dept = 28800 + (i as u32) * 600;
        for (stop, offset, seq, d) in [
            ("A", 0u32, 1i64, 0.0f64),
            ("B", 180, 2, 500.0),
            ("C", 420, 3, 900.0),
        ] {
            trip_id.push(trip.clone());
            arrival.push(dept + offset);
            stop_id.push(stop.to_string());
            sequence.push(seq);
            dist.push(d);
        }
    }
    // A slower parallel route between A and B only.
    for (i, trip) in trips_r2.iter().enumerate() {
        let dept = 28800 + (i as u32) * 600;
        for (stop, offset, seq, d) in [("A", 0u32, 1i64, 0.0f64), ("B", 600, 2, 500.0)] {
            trip_id.push(trip.clone());
            arrival.push(dept + offset);
            stop_id.push(stop.to_string());
            sequence.push(seq);
            dist.push(d);
        }
    }

    let mut all_trips = trips_r1.clone();
    all_trips.extend(trips_r2.clone());
    let route_ids: Vec<&str> = std::iter::repeat("r1")
        .take(trips_r1.len())
        .chain(std::iter::repeat("r2").take(trips_r2.len()))
        .collect();
    let shape_ids: Vec<Option<&str>> = std::iter::repeat(Some("S"))
        .take(trips_r1.len())
        .chain(std::iter::repeat(None).take(trips_r2.len()))
        .collect();
    let service_ids = vec![1i64; all_trips.len()];

    GtfsFeed {
        trips: df! {
            "trip_id" => &all_trips,
            "route_id" => &route_ids,
            "service_id" => &service_ids,
            "shape_id" => &shape_ids,
        }
        .unwrap(),
        stop_times: df! {
            "trip_id" => &trip_id,
            "arrival_time" => &arrival,
            "stop_id" => &stop_id,
            "stop_sequence" => &sequence,
            "shape_dist_traveled" => &dist,
        }
        .unwrap(),
        stops: df! {
            "stop_id" => &["A", "B", "C"],
            "stop_name" => &["Alpha", "Bravo", "Charlie"],
            "stop_lat" => &[49.2800, 49.2845, 49.2890],
            "stop_lon" => &[-123.1200, -123.1200, -123.1200],
        }
        .unwrap(),
        routes: df! {
            "route_id" => &["r1", "r2"],
            "route_short_name" => &[Some("R1"), Some("R2")],
            "route_long_name" => &[None::<&str>, None],
        }
        .unwrap(),
        transfers: df! {
            "from_stop_id" => &["A"],
            "to_stop_id" => &["B"],
            "min_transfer_time" => &[1200.0f64],
        }
        .unwrap(),
        shapes: df! {
            "shape_id" => &["S", "S", "S", "S", "S"],
            "shape_pt_lat" => &[49.2800, 49.28225, 49.2845, 49.2867, 49.2890],
            "shape_pt_lon" => &[-123.1200; 5],
            "shape_dist_traveled" => &[0.0f64, 250.0, 500.0, 700.0, 900.0],
        }
        .unwrap(),
    }
}

fn walk() -> WalkParams {
    WalkParams {
        walk_speed_mps: 1.0,
        max_walk_km: 0.2,
    }
}

#[test]
fn fastest_route_is_reconstructed_with_shape_geometry() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();

    let origin = Point::new(-123.1200, 49.2800); // at A
    let destination = Point::new(-123.1200, 49.2890); // at C

    let plan = route(&graph, &artifacts, &index, origin, destination, &walk())
        .unwrap()
        .expect("route should exist");

    assert_eq!(
        plan.steps,
        vec![
            "Walk to Alpha",
            "Wait for R1 (5.0 min avg wait)",
            "Ride to Bravo",
            "Ride to Charlie",
            "Get off vehicle",
            "Walk to final destination",
        ]
    );

    // wait 5 + ride 3 + ride 4, with zero-length walks at both ends.
    assert!((plan.total_mins - 12.0).abs() < 1e-6);

    // origin, A, two shape midpoints, B, C, destination, with exact
    // duplicates collapsed.
    let lats: Vec<f64> = plan.line.coords().map(|c| c.y).collect();
    assert_eq!(lats, vec![49.2800, 49.28225, 49.2845, 49.2867, 49.2890]);
}

#[test]
fn faster_of_two_routes_wins() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();

    let plan = route(
        &graph,
        &artifacts,
        &index,
        Point::new(-123.1200, 49.2800),
        Point::new(-123.1200, 49.2845),
        &walk(),
    )
    .unwrap()
    .expect("route should exist");

    // R1 (wait 5 + ride 3) beats R2 (wait 5 + ride 10) and the transfer
    // walk (10 min).
    assert!((plan.total_mins - 8.0).abs() < 1e-6);
    assert!(plan.steps.iter().any(|s| s.contains("Wait for R1")));
}

#[test]
fn no_service_window_produces_no_transit_edges() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("14:00")).unwrap();

    // Only the A -> B transfer walk survives.
    assert_eq!(graph.edge_count(), 1);

    // C is a kilometre out: no path on foot, no service, no route.
    let plan = route(
        &graph,
        &artifacts,
        &index,
        Point::new(-123.1200, 49.2800),
        Point::new(-123.1200, 49.2890),
        &walk(),
    )
    .unwrap();
    assert!(plan.is_none());
}

#[test]
fn sunday_service_is_empty() {
    let artifacts = build_artifacts(&feed_fixture(), 3).unwrap();
    assert!(artifacts.network_edges.is_empty());
}

#[test]
fn out_of_range_endpoints_yield_no_route() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();

    let plan = route(
        &graph,
        &artifacts,
        &index,
        Point::new(-123.4000, 49.2800),
        Point::new(-123.1200, 49.2845),
        &walk(),
    )
    .unwrap();
    assert!(plan.is_none());
}

#[test]
fn repeated_queries_leave_the_graph_untouched() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();

    let nodes_before: Vec<GraphNode> = graph.node_weights().cloned().collect();
    let edges_before: Vec<(usize, usize, GraphEdge)> = graph
        .edge_references()
        .map(|e| (e.source().index(), e.target().index(), e.weight().clone()))
        .collect();

    // Deterministic jitter around the network.
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 1000) as f64 / 1000.0
    };

    for _ in 0..100 {
        let origin = Point::new(-123.1200 + next() * 0.01, 49.2790 + next() * 0.01);
        let destination = Point::new(-123.1200 + next() * 0.01, 49.2790 + next() * 0.01);
        let _ = route(&graph, &artifacts, &index, origin, destination, &walk()).unwrap();
    }

    let nodes_after: Vec<GraphNode> = graph.node_weights().cloned().collect();
    let edges_after: Vec<(usize, usize, GraphEdge)> = graph
        .edge_references()
        .map(|e| (e.source().index(), e.target().index(), e.weight().clone()))
        .collect();

    assert_eq!(nodes_before, nodes_after);
    assert_eq!(edges_before, edges_after);
}

#[test]
fn identical_queries_return_identical_results() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();
    let index = StopIndex::build(&artifacts.stops);
    let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();

    let origin = Point::new(-123.1205, 49.2802);
    let destination = Point::new(-123.1195, 49.2888);

    let first = route(&graph, &artifacts, &index, origin, destination, &walk())
        .unwrap()
        .unwrap();
    let second = route(&graph, &artifacts, &index, origin, destination, &walk())
        .unwrap()
        .unwrap();

    assert_eq!(first.steps, second.steps);
    assert_eq!(first.line, second.line);
    assert_eq!(first.total_mins, second.total_mins);
}

#[test]
fn widening_the_window_only_grows_the_topology() {
    let artifacts = build_artifacts(&feed_fixture(), 1).unwrap();

    let narrow = TransitGraph::build(&artifacts, &GraphParams::new("08:30")).unwrap();
    let mut params = GraphParams::new("08:30");
    params.window_mins = 120;
    let wide = TransitGraph::build(&artifacts, &params).unwrap();

    assert!(wide.node_count() >= narrow.node_count());
    assert!(wide.edge_count() >= narrow.edge_count());
}
