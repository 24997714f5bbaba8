/*!
Point-to-point routing.

Snaps both endpoints, runs Dijkstra from the origin overlay, resolves the
virtual destination as the cheapest `score[stop] + final walk`, then walks
the predecessor chain backwards to emit textual steps and the polyline.
Travel edges are expanded through the shape store into the geometry the
vehicle traces; every other hop contributes the downstream stop coordinate.
*/

use geo::{Coord, LineString, Point};
use geojson::{Feature, Geometry, Value};
use petgraph::graph::NodeIndex;
use serde_json::map::Map;

use crate::algo::dijkstra;
use crate::artifacts::Artifacts;
use crate::connectors::{snap, SnapOverlay, WalkParams};
use crate::graph::{GraphEdge, TransitGraph};
use crate::index::StopIndex;
use crate::shapes::ShapeStore;
use crate::Error;

/// A complete itinerary: the traced line, its total cost in minutes and the
/// ordered instructions.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub line: LineString<f64>,
    pub total_mins: f64,
    pub steps: Vec<String>,
}

impl RoutePlan {
    /// One GeoJSON feature: the polyline, with duration and steps as
    /// properties.
    pub fn to_geojson(&self) -> geojson::GeoJson {
        let coords: Vec<Vec<f64>> = self
            .line
            .coords()
            .map(|coord| vec![coord.x, coord.y])
            .collect();

        let mut properties = Map::new();
        properties.insert("total_mins".to_string(), self.total_mins.into());
        properties.insert(
            "steps".to_string(),
            serde_json::Value::Array(self.steps.iter().cloned().map(Into::into).collect()),
        );

        geojson::GeoJson::Feature(Feature {
            geometry: Some(Geometry::new(Value::LineString(coords))),
            properties: Some(properties),
            id: None,
            bbox: None,
            foreign_members: None,
        })
    }
}

/// How the cheapest itinerary reaches the destination overlay.
enum Terminal {
    /// Through the graph, deboarding at this street node.
    Graph(NodeIndex),
    /// Walk to one stop and walk away from it; no transit involved.
    Direct(String),
}

/// Fastest itinerary between two coordinates, or `None` when either
/// endpoint has no stop in walking range or no path exists. Never returns
/// a partial route.
pub fn route(
    graph: &TransitGraph,
    artifacts: &Artifacts,
    index: &StopIndex,
    origin: Point<f64>,
    destination: Point<f64>,
    walk: &WalkParams,
) -> Result<Option<RoutePlan>, Error> {
    let source = snap(graph, index, origin, walk, None);
    if source.is_empty() {
        log::warn!(
            "no stops within {:.2} km of origin ({:.5}, {:.5})",
            walk.max_walk_km,
            origin.y(),
            origin.x()
        );
        return Ok(None);
    }
    let target = snap(graph, index, destination, walk, None);
    if target.is_empty() {
        log::warn!(
            "no stops within {:.2} km of destination ({:.5}, {:.5})",
            walk.max_walk_km,
            destination.y(),
            destination.x()
        );
        return Ok(None);
    }

    let search = dijkstra::run(graph, &source.seeds(), None, true);

    let mut best: Option<(f64, Terminal)> = None;
    for candidate in &target.candidates {
        if let Some(node) = candidate.node {
            if let Some(&score) = search.scores.get(&node) {
                let total = score + candidate.walk_mins;
                if best.as_ref().is_none_or(|(t, _)| total < *t) {
                    best = Some((total, Terminal::Graph(node)));
                }
            }
        }
        // A stop reachable on foot from both endpoints permits a pure-walk
        // itinerary even when it has no service in the window.
        if let Some(walk_in) = source.walk_mins_to(&candidate.stop_id) {
            let total = walk_in + candidate.walk_mins;
            if best.as_ref().is_none_or(|(t, _)| total < *t) {
                best = Some((total, Terminal::Direct(candidate.stop_id.clone())));
            }
        }
    }

    let Some((total_mins, terminal)) = best else {
        log::warn!("destination is not reachable from origin");
        return Ok(None);
    };

    let plan = match terminal {
        Terminal::Direct(stop_id) => {
            let mut steps = Vec::new();
            let mut coords = vec![Coord {
                x: origin.x(),
                y: origin.y(),
            }];
            steps.push(format!("Walk to {}", stop_display(artifacts, &stop_id)));
            push_stop_coord(&mut coords, artifacts, &stop_id);
            steps.push("Walk to final destination".to_string());
            coords.push(Coord {
                x: destination.x(),
                y: destination.y(),
            });
            RoutePlan {
                line: LineString::new(dedup_consecutive(coords)),
                total_mins,
                steps,
            }
        }
        Terminal::Graph(node) => {
            build_plan(graph, artifacts, &search, &source, node, total_mins, origin, destination)
        }
    };

    Ok(Some(plan))
}

#[allow(clippy::too_many_arguments)]
fn build_plan(
    graph: &TransitGraph,
    artifacts: &Artifacts,
    search: &dijkstra::SearchResult,
    source: &SnapOverlay,
    last_node: NodeIndex,
    total_mins: f64,
    origin: Point<f64>,
    destination: Point<f64>,
) -> RoutePlan {
    // Walk the predecessor chain back to the seeded boarding stop.
    let mut nodes = vec![last_node];
    let mut edges = Vec::new();
    let mut current = last_node;
    while let Some(&(previous, edge)) = search.predecessors.get(&current) {
        nodes.push(previous);
        edges.push(edge);
        current = previous;
    }
    nodes.reverse();
    edges.reverse();

    let store = ShapeStore::new(&artifacts.shapes);
    let mut steps = Vec::new();
    let mut coords = vec![Coord {
        x: origin.x(),
        y: origin.y(),
    }];

    let first_stop = graph.node_weight(nodes[0]).map(|n| n.stop_id().to_string());
    if let Some(stop_id) = &first_stop {
        debug_assert!(source.walk_mins_to(stop_id).is_some());
        steps.push(format!("Walk to {}", stop_display(artifacts, stop_id)));
        push_stop_coord(&mut coords, artifacts, stop_id);
    }

    for (edge_index, next_node) in edges.iter().zip(nodes.iter().skip(1)) {
        let next_stop = graph
            .node_weight(*next_node)
            .map(|n| n.stop_id().to_string())
            .unwrap_or_default();

        match graph.edge_weight(*edge_index) {
            Some(GraphEdge::Board { route, wait_mins }) => {
                steps.push(format!("Wait for {route} ({wait_mins:.1} min avg wait)"));
            }
            Some(GraphEdge::Travel { route, span, .. }) => {
                steps.push(format!("Ride to {}", stop_display(artifacts, &next_stop)));
                let sliced = span
                    .as_ref()
                    .map(|s| store.slice(&s.shape_id, s.dist_u, s.dist_v))
                    .unwrap_or_default();
                if sliced.is_empty() {
                    log::warn!("no shape geometry for ride to {next_stop} on {route}");
                    push_stop_coord(&mut coords, artifacts, &next_stop);
                } else {
                    coords.extend(sliced);
                }
            }
            Some(GraphEdge::Deboard) => {
                steps.push("Get off vehicle".to_string());
                push_stop_coord(&mut coords, artifacts, &next_stop);
            }
            Some(GraphEdge::Walk { .. }) => {
                steps.push(format!("Walk to {}", stop_display(artifacts, &next_stop)));
                push_stop_coord(&mut coords, artifacts, &next_stop);
            }
            None => {}
        }
    }

    steps.push("Walk to final destination".to_string());
    coords.push(Coord {
        x: destination.x(),
        y: destination.y(),
    });

    RoutePlan {
        line: LineString::new(dedup_consecutive(coords)),
        total_mins,
        steps,
    }
}

fn stop_display(artifacts: &Artifacts, stop_id: &str) -> String {
    artifacts
        .stops
        .get(stop_id)
        .map(|record| record.name.clone())
        .unwrap_or_else(|| stop_id.to_string())
}

fn push_stop_coord(coords: &mut Vec<Coord<f64>>, artifacts: &Artifacts, stop_id: &str) {
    match artifacts.stops.get(stop_id) {
        Some(record) => coords.push(Coord {
            x: record.lon,
            y: record.lat,
        }),
        None => log::warn!("stop {stop_id} is missing from the registry"),
    }
}

/// Drop repeated coordinates at segment boundaries.
fn dedup_consecutive(coords: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
    for coord in coords {
        if out.last() != Some(&coord) {
            out.push(coord);
        }
    }
    out
}
