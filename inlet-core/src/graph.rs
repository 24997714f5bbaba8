/*!
The time-windowed transit graph.

For a requested departure time the builder materialises a directed multigraph
over two node kinds: **street** nodes (one per stop) and **route** nodes (one
per stop × route pair). Boarding a route costs the average half-headway wait
observed inside the window; riding costs the average in-vehicle duration.
Transfers are walk edges between street nodes. All weights are minutes.

The graph is immutable once built. Queries never add virtual nodes to it;
snapping is an overlay consulted by the search (see [`crate::connectors`]).
A graph instance can serve any number of sequential queries and is
observationally identical before and after each one.
*/

use std::fmt::{self, Display};
use std::ops::Deref;

use hashbrown::HashMap;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::artifacts::{Artifacts, ShapeSpan, TRANSFER_KIND};
use crate::loaders::parse_hhmm;
use crate::Error;

/// Node identity. Route nodes keep stop and route as separate fields; the
/// canonical `"{stop}_{route}"` rendering exists only for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Street(String),
    Route { stop: String, route: String },
}

impl GraphNode {
    /// The stop this node stands on, regardless of kind.
    pub fn stop_id(&self) -> &str {
        match self {
            GraphNode::Street(stop) | GraphNode::Route { stop, .. } => stop,
        }
    }
}

impl Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Street(stop) => write!(f, "{stop}"),
            GraphNode::Route { stop, route } => write!(f, "{stop}_{route}"),
        }
    }
}

/// Edge payloads. Weights are minutes.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEdge {
    /// Street node to its route twin; the average wait for the next vehicle.
    Board { route: String, wait_mins: f64 },
    /// Route node to the successor route node; the average in-vehicle time,
    /// with the span locating the ride on its shape polyline.
    Travel {
        route: String,
        mins: f64,
        span: Option<ShapeSpan>,
    },
    /// Route node back to its street twin. Free.
    Deboard,
    /// Street-to-street walking transfer.
    Walk { mins: f64 },
}

impl GraphEdge {
    pub fn weight_mins(&self) -> f64 {
        match self {
            GraphEdge::Board { wait_mins, .. } => *wait_mins,
            GraphEdge::Travel { mins, .. } => *mins,
            GraphEdge::Deboard => 0.0,
            GraphEdge::Walk { mins } => *mins,
        }
    }
}

/// Knobs for one graph materialisation.
#[derive(Debug, Clone)]
pub struct GraphParams {
    /// Centre of the departure window, `"HH:MM"`.
    pub time_str: String,
    /// Width of the window, minutes.
    pub window_mins: u32,
    /// Scales the observed service frequency; 2.0 halves every wait.
    pub frequency_modifier: f64,
    /// Divides in-vehicle durations.
    pub speed_factor: f64,
}

impl GraphParams {
    pub fn new(time_str: impl Into<String>) -> Self {
        GraphParams {
            time_str: time_str.into(),
            window_mins: 60,
            frequency_modifier: 1.0,
            speed_factor: 1.0,
        }
    }
}

/// The materialised graph plus a node lookup by identity.
pub struct TransitGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    nodes: HashMap<GraphNode, NodeIndex>,
}

impl TransitGraph {
    /// Build the time-windowed graph from preprocessed artifacts.
    ///
    /// Network edges with no departure inside the window contribute nothing.
    /// A board edge is added once per `(street, route)` pair; the first
    /// window to reach it fixes the wait.
    pub fn build(artifacts: &Artifacts, params: &GraphParams) -> Result<Self, Error> {
        if params.window_mins == 0 {
            return Err(Error::InvalidData("window_mins must be positive".into()));
        }
        if params.frequency_modifier <= 0.0 || params.speed_factor <= 0.0 {
            return Err(Error::InvalidData(
                "frequency_modifier and speed_factor must be positive".into(),
            ));
        }

        let center = i64::from(parse_hhmm(&params.time_str)?);
        let window_sec = i64::from(params.window_mins) * 60;
        let (start, end) = (center - window_sec / 2, center + window_sec / 2);

        let mut built = TransitGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };

        for ((u, v, route), edge) in &artifacts.network_edges {
            let valid: Vec<u32> = edge
                .trips
                .iter()
                .filter(|trip| {
                    let dept = i64::from(trip.dept_sec);
                    start <= dept && dept <= end
                })
                .map(|trip| trip.dur_sec)
                .collect();
            if valid.is_empty() {
                continue;
            }

            let count = valid.len() as f64;
            let avg_dur_sec = valid.iter().map(|&d| f64::from(d)).sum::<f64>() / count;
            let travel_mins = (avg_dur_sec / params.speed_factor) / 60.0;

            let headway_sec = window_sec as f64 / count;
            let wait_mins = (headway_sec / 2.0) / 60.0 / params.frequency_modifier;

            let u_street = built.ensure_node(GraphNode::Street(u.clone()));
            let v_street = built.ensure_node(GraphNode::Street(v.clone()));
            let u_route = built.ensure_node(GraphNode::Route {
                stop: u.clone(),
                route: route.clone(),
            });
            let v_route = built.ensure_node(GraphNode::Route {
                stop: v.clone(),
                route: route.clone(),
            });

            if built.graph.find_edge(u_street, u_route).is_none() {
                built.graph.add_edge(
                    u_street,
                    u_route,
                    GraphEdge::Board {
                        route: route.clone(),
                        wait_mins,
                    },
                );
            }
            built.graph.add_edge(
                u_route,
                v_route,
                GraphEdge::Travel {
                    route: route.clone(),
                    mins: travel_mins,
                    span: edge.span.clone(),
                },
            );
            if built.graph.find_edge(v_route, v_street).is_none() {
                built.graph.add_edge(v_route, v_street, GraphEdge::Deboard);
            }
        }

        for ((u, v, kind), secs) in &artifacts.transfer_edges {
            debug_assert_eq!(kind, TRANSFER_KIND);
            let u_street = built.ensure_node(GraphNode::Street(u.clone()));
            let v_street = built.ensure_node(GraphNode::Street(v.clone()));
            built
                .graph
                .add_edge(u_street, v_street, GraphEdge::Walk { mins: secs / 60.0 });
        }

        log::info!(
            "built graph for {} ±{} min: {} nodes, {} edges",
            params.time_str,
            params.window_mins / 2,
            built.graph.node_count(),
            built.graph.edge_count()
        );

        Ok(built)
    }

    fn ensure_node(&mut self, node: GraphNode) -> NodeIndex {
        match self.nodes.get(&node) {
            Some(&index) => index,
            None => {
                let index = self.graph.add_node(node.clone());
                self.nodes.insert(node, index);
                index
            }
        }
    }

    /// The street node for a stop, if the stop is in this window's graph.
    pub fn street_node(&self, stop_id: &str) -> Option<NodeIndex> {
        self.nodes
            .get(&GraphNode::Street(stop_id.to_string()))
            .copied()
    }

    pub fn inner(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }
}

/// Read-only access to the backing [`DiGraph`]; the graph is never mutated
/// after construction.
impl Deref for TransitGraph {
    type Target = DiGraph<GraphNode, GraphEdge>;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{NetworkEdge, TripTime};
    use approx::abs_diff_eq;
    use petgraph::visit::EdgeRef;
    use petgraph::Direction;

    fn artifacts_fixture() -> Artifacts {
        let mut artifacts = Artifacts::default();
        // Departures every 10 minutes across 08:00..09:00.
        let trips: Vec<TripTime> = (0..6)
            .map(|i| TripTime {
                dept_sec: 28800 + i * 600,
                dur_sec: 180,
            })
            .collect();
        artifacts.network_edges.insert(
            ("A".into(), "B".into(), "R1".into()),
            NetworkEdge { span: None, trips },
        );
        artifacts
            .transfer_edges
            .insert(("B".into(), "C".into(), TRANSFER_KIND.into()), 120.0);
        artifacts
    }

    #[test]
    fn weights_encode_half_headway_and_average_duration() {
        let graph = TransitGraph::build(&artifacts_fixture(), &GraphParams::new("08:30")).unwrap();

        let a = graph.street_node("A").unwrap();
        let board = graph
            .edges(a)
            .find_map(|edge| match edge.weight() {
                GraphEdge::Board { wait_mins, .. } => Some(*wait_mins),
                _ => None,
            })
            .unwrap();
        // 6 departures in a 3600 s window: headway 600 s, wait 5 min.
        assert!(abs_diff_eq!(board, 5.0));

        let travel = graph
            .edge_references()
            .find_map(|edge| match edge.weight() {
                GraphEdge::Travel { mins, .. } => Some(*mins),
                _ => None,
            })
            .unwrap();
        assert!(abs_diff_eq!(travel, 3.0));

        let walk = graph
            .edge_references()
            .find_map(|edge| match edge.weight() {
                GraphEdge::Walk { mins } => Some(*mins),
                _ => None,
            })
            .unwrap();
        assert!(abs_diff_eq!(walk, 2.0));
    }

    #[test]
    fn frequency_modifier_scales_wait_only() {
        let mut params = GraphParams::new("08:30");
        params.frequency_modifier = 2.0;
        let graph = TransitGraph::build(&artifacts_fixture(), &params).unwrap();

        let a = graph.street_node("A").unwrap();
        let board = graph
            .edges(a)
            .find_map(|edge| match edge.weight() {
                GraphEdge::Board { wait_mins, .. } => Some(*wait_mins),
                _ => None,
            })
            .unwrap();
        assert!(abs_diff_eq!(board, 2.5));
    }

    #[test]
    fn speed_factor_divides_travel_time() {
        let mut params = GraphParams::new("08:30");
        params.speed_factor = 2.0;
        let graph = TransitGraph::build(&artifacts_fixture(), &params).unwrap();

        let travel = graph
            .edge_references()
            .find_map(|edge| match edge.weight() {
                GraphEdge::Travel { mins, .. } => Some(*mins),
                _ => None,
            })
            .unwrap();
        assert!(abs_diff_eq!(travel, 1.5));
    }

    #[test]
    fn out_of_window_service_contributes_nothing() {
        let graph = TransitGraph::build(&artifacts_fixture(), &GraphParams::new("14:00")).unwrap();
        // Only the transfer survives: two street nodes, one walk edge.
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.street_node("A").is_none());
    }

    #[test]
    fn route_nodes_obey_the_edge_type_invariants() {
        let graph = TransitGraph::build(&artifacts_fixture(), &GraphParams::new("08:30")).unwrap();

        for node in graph.node_indices() {
            let weight = graph.node_weight(node).unwrap();
            match weight {
                GraphNode::Route { stop, .. } => {
                    for edge in graph.edges_directed(node, Direction::Incoming) {
                        match edge.weight() {
                            GraphEdge::Board { .. } => {
                                let source = graph.node_weight(edge.source()).unwrap();
                                assert_eq!(source, &GraphNode::Street(stop.clone()));
                            }
                            GraphEdge::Travel { .. } => {}
                            other => panic!("unexpected incoming edge {other:?}"),
                        }
                    }
                    for edge in graph.edges_directed(node, Direction::Outgoing) {
                        match edge.weight() {
                            GraphEdge::Deboard => {
                                let target = graph.node_weight(edge.target()).unwrap();
                                assert_eq!(target, &GraphNode::Street(stop.clone()));
                                assert!(abs_diff_eq!(edge.weight().weight_mins(), 0.0));
                            }
                            GraphEdge::Travel { .. } => {}
                            other => panic!("unexpected outgoing edge {other:?}"),
                        }
                    }
                }
                GraphNode::Street(_) => {
                    for edge in graph.edges_directed(node, Direction::Outgoing) {
                        if let GraphEdge::Walk { .. } = edge.weight() {
                            let target = graph.node_weight(edge.target()).unwrap();
                            assert!(matches!(target, GraphNode::Street(_)));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_nonsense_parameters() {
        let mut params = GraphParams::new("08:30");
        params.frequency_modifier = 0.0;
        assert!(TransitGraph::build(&artifacts_fixture(), &params).is_err());

        assert!(TransitGraph::build(&artifacts_fixture(), &GraphParams::new("25:00")).is_err());
    }
}
