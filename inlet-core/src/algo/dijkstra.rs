//! Single-source shortest paths over the time-windowed graph.
//!
//! Classic Dijkstra on static minute weights, with two departures from the
//! textbook shape: the frontier is seeded from a snap overlay (several
//! stops, each preloaded with its walk cost) rather than a single node, and
//! an optional cutoff prunes everything past the query budget. The loop
//! structure follows the implementation in the [`petgraph`] crate.

use std::collections::BinaryHeap;

use hashbrown::hash_map::Entry::{Occupied, Vacant};
use hashbrown::{HashMap, HashSet};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::algo::MinScored;
use crate::graph::TransitGraph;

pub(crate) struct SearchResult {
    /// Best known cost in minutes to each settled or discovered node.
    pub scores: HashMap<NodeIndex, f64>,
    /// `node -> (previous node, connecting edge)`; empty unless requested.
    /// Seed nodes have no predecessor.
    pub predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
}

pub(crate) fn run(
    graph: &TransitGraph,
    seeds: &[(NodeIndex, f64)],
    cutoff: Option<f64>,
    record_paths: bool,
) -> SearchResult {
    let mut visited = HashSet::new();
    let mut scores: HashMap<NodeIndex, f64> = HashMap::with_capacity(graph.node_count());
    let mut predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
    let mut visit_next = BinaryHeap::new();

    for &(node, cost) in seeds {
        if cutoff.is_some_and(|limit| cost > limit) {
            continue;
        }
        match scores.entry(node) {
            Occupied(mut ent) => {
                if cost < *ent.get() {
                    ent.insert(cost);
                    visit_next.push(MinScored(cost, node));
                }
            }
            Vacant(ent) => {
                ent.insert(cost);
                visit_next.push(MinScored(cost, node));
            }
        }
    }

    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if visited.contains(&node) {
            continue;
        }

        for edge in graph.edges(node) {
            let next = edge.target();
            if visited.contains(&next) {
                continue;
            }

            let next_score = node_score + edge.weight().weight_mins();
            if cutoff.is_some_and(|limit| next_score > limit) {
                continue;
            }

            match scores.entry(next) {
                Occupied(mut ent) => {
                    if next_score < *ent.get() {
                        ent.insert(next_score);
                        visit_next.push(MinScored(next_score, next));
                        if record_paths {
                            predecessors.insert(next, (node, edge.id()));
                        }
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_score);
                    visit_next.push(MinScored(next_score, next));
                    if record_paths {
                        predecessors.insert(next, (node, edge.id()));
                    }
                }
            }
        }
        visited.insert(node);
    }

    SearchResult {
        scores,
        predecessors,
    }
}
