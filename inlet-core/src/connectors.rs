/*!
Snapping query coordinates onto the network.

A query point never becomes a graph node. Snapping produces a
[`SnapOverlay`], the set of walk connections the virtual origin or
destination would have, and the search layer consults it instead of
mutating the graph. Every return path therefore leaves the graph
observationally identical to its pre-query state, by construction.

Candidates include stops with no service in the current window (they exist
in the stop registry but not in the graph); the isochrone still owes them
their residual walk disk.
*/

use geo::Point;
use petgraph::graph::NodeIndex;

use crate::graph::TransitGraph;
use crate::index::StopIndex;

/// User walking parameters shared by both query kinds.
#[derive(Debug, Clone, Copy)]
pub struct WalkParams {
    pub walk_speed_mps: f64,
    pub max_walk_km: f64,
}

impl Default for WalkParams {
    fn default() -> Self {
        WalkParams {
            walk_speed_mps: 1.2,
            max_walk_km: 1.0,
        }
    }
}

/// One reachable-on-foot stop. `node` is `None` when the stop has no
/// service in the window and so no street node in the graph.
#[derive(Debug, Clone)]
pub struct SnapCandidate {
    pub stop_id: String,
    pub node: Option<NodeIndex>,
    pub walk_mins: f64,
}

/// The virtual-node adjacency for one endpoint of a query.
#[derive(Debug, Default)]
pub struct SnapOverlay {
    pub candidates: Vec<SnapCandidate>,
}

impl SnapOverlay {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Seed list for Dijkstra: stops that exist in the graph, with the walk
    /// time as their initial cost.
    pub(crate) fn seeds(&self) -> Vec<(NodeIndex, f64)> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.node.map(|node| (node, candidate.walk_mins)))
            .collect()
    }

    pub(crate) fn walk_mins_to(&self, stop_id: &str) -> Option<f64> {
        self.candidates
            .iter()
            .find(|candidate| candidate.stop_id == stop_id)
            .map(|candidate| candidate.walk_mins)
    }
}

/// Connect a point to every stop within `max_walk_km`. With a `budget`,
/// stops that cost the whole budget or more to reach on foot are left out.
pub(crate) fn snap(
    graph: &TransitGraph,
    index: &StopIndex,
    point: Point<f64>,
    walk: &WalkParams,
    budget_mins: Option<f64>,
) -> SnapOverlay {
    let mut candidates = Vec::new();

    for (stop_id, distance_m) in index.within_radius(point, walk.max_walk_km) {
        let walk_mins = distance_m / (walk.walk_speed_mps * 60.0);
        if let Some(budget) = budget_mins {
            if walk_mins >= budget {
                continue;
            }
        }
        let node = graph.street_node(&stop_id);
        candidates.push(SnapCandidate {
            stop_id,
            node,
            walk_mins,
        });
    }

    SnapOverlay { candidates }
}
