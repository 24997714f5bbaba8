//! Convenience re-exports for the common query flow.

pub use crate::artifacts::{
    Artifacts, EdgeKey, NetworkEdge, ShapeLine, ShapeSpan, StopRecord, TripTime, TRANSFER_KIND,
};
pub use crate::connectors::WalkParams;
pub use crate::geo_ops::{LandMask, Projector};
pub use crate::graph::{GraphEdge, GraphNode, GraphParams, TransitGraph};
pub use crate::index::StopIndex;
pub use crate::loaders::{parse_hhmm, GtfsFeed};
pub use crate::preprocess::build_artifacts;
pub use crate::shapes::ShapeStore;
pub use crate::Error;

#[cfg(feature = "isochrone")]
pub use crate::algo::isochrone;
pub use crate::algo::{route, RoutePlan};
