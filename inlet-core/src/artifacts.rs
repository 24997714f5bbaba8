/*!
Persisted preprocessing artifacts.

The preprocessor reduces a GTFS feed to four disk-backed structures that the
graph builder consumes without re-parsing the feed: network edges keyed by
`(u_stop, v_stop, route_name)`, walking transfers, the stop registry and the
shape polylines. Artifacts are immutable after load and shared read-only
across queries.

Serialisation is CBOR via [`ciborium`]; unlike JSON it round-trips the
tuple-keyed maps directly.
*/

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Marker used as the third key component of transfer edges, so transfer
/// and network edge keys share one namespace in the persisted artifacts.
pub const TRANSFER_KIND: &str = "transfer";

/// `(u_stop, v_stop, route_name)`, or `(u_stop, v_stop, "transfer")`.
pub type EdgeKey = (String, String, String);

/// One scheduled departure on a network edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripTime {
    /// Departure from the origin stop, seconds since midnight. GTFS allows
    /// values past 86400 for post-midnight service.
    pub dept_sec: u32,
    /// In-vehicle duration to the destination stop, seconds.
    pub dur_sec: u32,
}

/// Where a network edge lies on its shape polyline. Distances are in
/// feed-specific units and are only ever compared, never converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSpan {
    pub shape_id: String,
    pub dist_u: f64,
    pub dist_v: f64,
}

/// All scheduled service between one ordered stop pair on one route.
///
/// The span is fixed by the first observation of the key; later observations
/// only append trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub span: Option<ShapeSpan>,
    pub trips: Vec<TripTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A shape polyline as parallel arrays: cumulative distances (ascending) and
/// `(lon, lat)` coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeLine {
    pub dists: Vec<f64>,
    pub coords: Vec<(f64, f64)>,
}

/// The four preprocessing outputs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Artifacts {
    pub network_edges: HashMap<EdgeKey, NetworkEdge>,
    pub transfer_edges: HashMap<EdgeKey, f64>,
    pub stops: HashMap<String, StopRecord>,
    pub shapes: HashMap<String, ShapeLine>,
}

impl Artifacts {
    /// Write all four artifacts under `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), Error> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        write_cbor(&dir.join("network_edges.bin"), &self.network_edges)?;
        write_cbor(&dir.join("transfer_edges.bin"), &self.transfer_edges)?;
        write_cbor(&dir.join("stops.bin"), &self.stops)?;
        write_cbor(&dir.join("shapes.bin"), &self.shapes)?;
        Ok(())
    }

    /// Read artifacts previously written by [`Artifacts::save`]. A missing
    /// file is fatal.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();
        Ok(Artifacts {
            network_edges: read_cbor(&dir.join("network_edges.bin"))?,
            transfer_edges: read_cbor(&dir.join("transfer_edges.bin"))?,
            stops: read_cbor(&dir.join("stops.bin"))?,
            shapes: read_cbor(&dir.join("shapes.bin"))?,
        })
    }
}

fn write_cbor<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let file = File::create(path)?;
    ciborium::ser::into_writer(value, BufWriter::new(file))
        .map_err(|e| Error::EncodeError(e.to_string()))
}

fn read_cbor<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let file = File::open(path)?;
    ciborium::de::from_reader(BufReader::new(file)).map_err(|e| Error::DecodeError(e.to_string()))
}
