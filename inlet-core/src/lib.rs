/*!
# Inlet

**Inlet** is a routing engine for answering reachability questions over a
metropolitan public-transit network described by a GTFS feed. It was built
for the Metro Vancouver network but is feed-agnostic.

Two queries are supported:

- **isochrone**: the geographic area reachable from an origin within a
  walking + riding time budget, returned as a multipolygon clipped to land;
- **route**: the fastest walk/board/ride/deboard itinerary between two
  coordinates, returned as a polyline plus textual steps.

The pipeline has three stages. [`preprocess::build_artifacts`] normalises the
raw feed tables into indexed edge records. [`graph::TransitGraph::build`]
materialises a directed time-windowed graph for a requested departure time,
where boarding costs encode average half-headway wait and travel costs encode
average in-vehicle duration. The query layer snaps user coordinates into the
graph through a haversine nearest-neighbour index and runs Dijkstra.

# Example
```ignore
use geo::Point;
use inlet_core::prelude::*;

let feed = GtfsFeed::read("data/gtfs")?;
let artifacts = build_artifacts(&feed, 1)?;
let index = StopIndex::build(&artifacts.stops);

let graph = TransitGraph::build(&artifacts, &GraphParams::new("08:30"))?;
let plan = route(
    &graph,
    &artifacts,
    &index,
    Point::new(-123.1207, 49.2827),
    Point::new(-123.0024, 49.2496),
    &WalkParams::default(),
)?;
```
*/

use polars::prelude::PolarsError;
use thiserror::Error;

pub mod algo;
pub mod artifacts;
pub mod connectors;
pub mod geo_ops;
pub mod graph;
pub mod index;
pub mod loaders;
pub mod prelude;
pub mod preprocess;
pub mod shapes;

/// Walk disks smaller than this are dropped from isochrone output, metres.
pub(crate) const MIN_WALK_RADIUS_M: f64 = 10.0;

/// Error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid time literal {0:?}")]
    InvalidTime(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("missing value in column: {0}")]
    MissingValue(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("artifact encode error: {0}")]
    EncodeError(String),
    #[error("artifact decode error: {0}")]
    DecodeError(String),
    #[error("projection error: {0}")]
    ProjectionError(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),
    #[cfg(feature = "isochrone")]
    #[error("geometry error: {0}")]
    GeosError(#[from] geos::Error),
}

impl From<Error> for PolarsError {
    fn from(err: Error) -> Self {
        match err {
            Error::PolarsError(e) => e,
            _ => Self::ComputeError(err.to_string().into()),
        }
    }
}
