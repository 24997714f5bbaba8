/*!
Shape geometry lookup.

A [`ShapeStore`] borrows the shapes artifact and answers distance-window
queries: which polyline coordinates lie between two cumulative distance
marks. The router uses this to expand a ride between two stops into the
dense geometry the vehicle actually traces.
*/

use geo::Coord;
use hashbrown::HashMap;

use crate::artifacts::ShapeLine;

pub struct ShapeStore<'a> {
    shapes: &'a HashMap<String, ShapeLine>,
}

impl<'a> ShapeStore<'a> {
    pub fn new(shapes: &'a HashMap<String, ShapeLine>) -> Self {
        ShapeStore { shapes }
    }

    /// Coordinates whose cumulative distance lies in `(dist_u, dist_v]`,
    /// found by binary search on both endpoints. An unknown shape id or an
    /// empty window yields an empty slice; the caller decides the fallback.
    pub fn slice(&self, shape_id: &str, dist_u: f64, dist_v: f64) -> Vec<Coord<f64>> {
        let Some(line) = self.shapes.get(shape_id) else {
            return Vec::new();
        };

        let start = line.dists.partition_point(|&d| d <= dist_u);
        let end = line.dists.partition_point(|&d| d <= dist_v);
        if start >= end {
            return Vec::new();
        }

        line.coords[start..end]
            .iter()
            .map(|&(x, y)| Coord { x, y })
            .collect()
    }

    pub fn contains(&self, shape_id: &str) -> bool {
        self.shapes.contains_key(shape_id)
    }
}
