pub mod dijkstra;
#[cfg(feature = "isochrone")]
pub mod isochrone;
pub mod itinerary;

#[cfg(feature = "isochrone")]
pub use isochrone::isochrone;
pub use itinerary::{route, RoutePlan};

use std::cmp::Ordering;

/// `MinScored<K>` holds an `f64` score and a scored object `K` in a pair
/// for use with a `BinaryHeap`.
///
/// `MinScored` compares in reverse order by the score, so that the heap
/// behaves as a min-heap and extracts the pair with the least score.
/// This implementation is based on the one in the `petgraph` crate.
#[derive(Copy, Clone, PartialEq)]
pub(crate) struct MinScored<K>(pub f64, pub K);

impl<K: Eq> Eq for MinScored<K> {}

impl<K: PartialOrd> PartialOrd for MinScored<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.0.partial_cmp(&self.0)
    }
}

impl<K: Ord> Ord for MinScored<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.partial_cmp(&self.0).unwrap()
    }
}
