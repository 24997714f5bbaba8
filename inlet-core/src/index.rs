/*!
Spatial index over stops.

An R-tree in lon/lat degrees with exact haversine postfiltering. The tree
prefilter uses a conservative degree window (longitude degrees shrink with
latitude, so the window is widened by `1 / cos(lat)`); every candidate is
then measured precisely along the great circle.
*/

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::artifacts::StopRecord;

const METRES_PER_DEGREE: f64 = 111_320.0;

type IndexedStop = GeomWithData<Point<f64>, String>;

pub struct StopIndex {
    tree: RTree<IndexedStop>,
}

impl StopIndex {
    pub fn build(stops: &HashMap<String, StopRecord>) -> Self {
        let entries: Vec<IndexedStop> = stops
            .iter()
            .map(|(stop_id, record)| {
                IndexedStop::new(Point::new(record.lon, record.lat), stop_id.clone())
            })
            .collect();

        StopIndex {
            tree: RTree::bulk_load(entries),
        }
    }

    /// All stops within `max_walk_km` of `point`, with their great-circle
    /// distances in metres, nearest first.
    pub fn within_radius(&self, point: Point<f64>, max_walk_km: f64) -> Vec<(String, f64)> {
        let lat_scale = point.y().to_radians().cos().abs().max(0.01);
        let window_deg = max_walk_km * 1000.0 / (METRES_PER_DEGREE * lat_scale);

        let mut hits: Vec<(String, f64)> = self
            .tree
            .locate_within_distance(point, window_deg * window_deg)
            .filter_map(|stop| {
                let distance = Haversine::distance(point, *stop.geom());
                (distance <= max_walk_km * 1000.0).then(|| (stop.data.clone(), distance))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// The single closest stop, if any.
    pub fn nearest(&self, point: Point<f64>) -> Option<(String, f64)> {
        self.tree.nearest_neighbor(&point).map(|stop| {
            let distance = Haversine::distance(point, *stop.geom());
            (stop.data.clone(), distance)
        })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
