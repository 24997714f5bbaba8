/*!
Isochrone construction.

From the Dijkstra reach map, every stop arrived at with time to spare gets a
walk disk sized by its residual budget. The disks are buffered in BC Albers,
dissolved and clipped to land. Components without a single seed stop are
islands the raw union happened to touch across water; they are discarded.
*/

use geo::{MultiPolygon, Point};
use hashbrown::HashMap;

use crate::algo::dijkstra;
use crate::artifacts::Artifacts;
use crate::connectors::{snap, WalkParams};
use crate::geo_ops::{self, LandMask, Projector};
use crate::graph::TransitGraph;
use crate::index::StopIndex;
use crate::{Error, MIN_WALK_RADIUS_M};

/// The area reachable from `origin` within `budget_mins`, as an EPSG:4326
/// multipolygon, or `None` when nothing is reachable (origin off land, no
/// stop in walking range, or every disk degenerate).
pub fn isochrone(
    graph: &TransitGraph,
    artifacts: &Artifacts,
    index: &StopIndex,
    land: &LandMask,
    projector: &Projector,
    origin: Point<f64>,
    budget_mins: f64,
    walk: &WalkParams,
) -> Result<Option<MultiPolygon<f64>>, Error> {
    if !land.contains(&origin) {
        log::warn!(
            "origin ({:.5}, {:.5}) is outside the land mask",
            origin.y(),
            origin.x()
        );
        return Ok(None);
    }

    let overlay = snap(graph, index, origin, walk, Some(budget_mins));
    if overlay.is_empty() {
        log::warn!(
            "no stops within {:.2} km of origin ({:.5}, {:.5})",
            walk.max_walk_km,
            origin.y(),
            origin.x()
        );
        return Ok(None);
    }

    let search = dijkstra::run(graph, &overlay.seeds(), Some(budget_mins), false);

    // Collapse street and boarded variants of each stop to the best time.
    // Snapped stops without service in the window still count: the origin
    // walk reaches them.
    let mut best: HashMap<&str, f64> = HashMap::new();
    for candidate in &overlay.candidates {
        best.entry(candidate.stop_id.as_str())
            .and_modify(|t| *t = t.min(candidate.walk_mins))
            .or_insert(candidate.walk_mins);
    }
    for (node, &mins) in &search.scores {
        let Some(weight) = graph.node_weight(*node) else {
            continue;
        };
        best.entry(weight.stop_id())
            .and_modify(|t| *t = t.min(mins))
            .or_insert(mins);
    }
    if best.is_empty() {
        return Ok(None);
    }

    // Residual walk disks, projected to metres.
    let mut disks = Vec::with_capacity(best.len());
    for (stop_id, mins) in best {
        let remaining = budget_mins - mins;
        let radius_m = (remaining * walk.walk_speed_mps * 60.0).min(walk.max_walk_km * 1000.0);
        if radius_m <= MIN_WALK_RADIUS_M {
            continue;
        }
        let Some(record) = artifacts.stops.get(stop_id) else {
            log::warn!("reached stop {stop_id} is missing from the registry");
            continue;
        };
        let centre = projector.to_albers_point(Point::new(record.lon, record.lat))?;
        disks.push((centre, radius_m));
    }
    if disks.is_empty() {
        return Ok(None);
    }

    let union = geo_ops::buffered_union(&disks)?;
    let clipped = geo_ops::clip_to_land(&union, land)?;

    let seeds: Vec<Point<f64>> = disks.iter().map(|&(centre, _)| centre).collect();
    let Some(kept) = geo_ops::components_containing(&clipped, &seeds)? else {
        return Ok(None);
    };

    Ok(Some(projector.to_wgs84_multipolygon(&kept)?))
}
