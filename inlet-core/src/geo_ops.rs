/*!
Geometry operations behind the isochrone pipeline.

Buffering by a metric radius is only meaningful in a planar metre-based
CRS, so everything geometric happens in BC Albers (EPSG:3005) and results
are reprojected to WGS84 (EPSG:4326) on the way out. Buffering, unary
union and overlay intersection are delegated to GEOS; the component and
containment filtering happens on `geo` types.
*/

use geo::{Contains, Coord, MultiPolygon, Point, Polygon};
use geojson::GeoJson;
use proj::Proj;
use std::path::Path;

use crate::Error;

#[cfg(feature = "isochrone")]
use geos::Geom;
#[cfg(feature = "isochrone")]
use rayon::prelude::*;

/// Circle approximation for buffered walk disks, quadrant segments.
#[cfg(feature = "isochrone")]
const BUFFER_QUADSEGS: i32 = 8;

/// A WGS84 ↔ BC Albers transformer pair.
pub struct Projector {
    forward: Proj,
    inverse: Proj,
}

impl Projector {
    pub fn new() -> Result<Self, Error> {
        let forward = Proj::new_known_crs("EPSG:4326", "EPSG:3005", None)
            .map_err(|e| Error::ProjectionError(e.to_string()))?;
        let inverse = Proj::new_known_crs("EPSG:3005", "EPSG:4326", None)
            .map_err(|e| Error::ProjectionError(e.to_string()))?;
        Ok(Projector { forward, inverse })
    }

    /// Lon/lat degrees to Albers metres.
    pub fn to_albers_point(&self, point: Point<f64>) -> Result<Point<f64>, Error> {
        let (x, y) = self
            .forward
            .convert((point.x(), point.y()))
            .map_err(|e| Error::ProjectionError(e.to_string()))?;
        Ok(Point::new(x, y))
    }

    pub fn to_albers_multipolygon(
        &self,
        multipolygon: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, Error> {
        map_multipolygon(multipolygon, &self.forward)
    }

    pub fn to_wgs84_multipolygon(
        &self,
        multipolygon: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, Error> {
        map_multipolygon(multipolygon, &self.inverse)
    }
}

fn map_multipolygon(
    multipolygon: &MultiPolygon<f64>,
    proj: &Proj,
) -> Result<MultiPolygon<f64>, Error> {
    use geo::MapCoords;
    multipolygon
        .try_map_coords(|coord| {
            proj.convert((coord.x, coord.y))
                .map(|(x, y)| Coord { x, y })
        })
        .map_err(|e| Error::ProjectionError(e.to_string()))
}

/// The land polygon for the service region, kept in both CRSes: WGS84 for
/// containment checks against user coordinates, Albers for clipping.
pub struct LandMask {
    wgs84: MultiPolygon<f64>,
    #[cfg(feature = "isochrone")]
    albers: geos::Geometry,
}

impl LandMask {
    /// Read an EPSG:4326 GeoJSON file of one or more land polygons.
    /// A missing or unreadable file is fatal at startup.
    pub fn from_geojson_file(path: impl AsRef<Path>, projector: &Projector) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&raw, projector)
    }

    #[cfg_attr(not(feature = "isochrone"), allow(unused_variables))]
    pub fn from_geojson_str(raw: &str, projector: &Projector) -> Result<Self, Error> {
        let geojson: GeoJson = raw.parse::<GeoJson>()?;
        let collection = geojson::quick_collection(&geojson)?;

        let mut polygons = Vec::new();
        for geometry in collection {
            flatten_polygons(geometry, &mut polygons);
        }
        if polygons.is_empty() {
            return Err(Error::InvalidData(
                "land mask contains no polygons".to_string(),
            ));
        }
        let wgs84 = MultiPolygon::new(polygons);

        #[cfg(feature = "isochrone")]
        let albers = {
            let projected = projector.to_albers_multipolygon(&wgs84)?;
            geos::Geometry::try_from(geo::Geometry::MultiPolygon(projected))?
        };

        Ok(LandMask {
            wgs84,
            #[cfg(feature = "isochrone")]
            albers,
        })
    }

    /// Is the (lon, lat) point on land?
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.wgs84.contains(point)
    }
}

fn flatten_polygons(geometry: geo::Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        geo::Geometry::Polygon(polygon) => out.push(polygon),
        geo::Geometry::MultiPolygon(multi) => out.extend(multi.0),
        geo::Geometry::GeometryCollection(collection) => {
            for inner in collection {
                flatten_polygons(inner, out);
            }
        }
        _ => {}
    }
}

/// Union of metric walk disks: each `(centre, radius_m)` pair is buffered
/// and the disks dissolve into one (multi)polygon.
#[cfg(feature = "isochrone")]
pub fn buffered_union(disks: &[(Point<f64>, f64)]) -> Result<geos::Geometry, Error> {
    let buffers = disks
        .par_iter()
        .map(|&(centre, radius_m)| {
            geos::Geometry::try_from(centre)?.buffer(radius_m, BUFFER_QUADSEGS)
        })
        .collect::<Result<Vec<_>, geos::Error>>()?;

    Ok(geos::Geometry::create_multipolygon(buffers)?.unary_union()?)
}

/// Clip a dissolved reach polygon to the land mask.
#[cfg(feature = "isochrone")]
pub fn clip_to_land(reach: &geos::Geometry, land: &LandMask) -> Result<geos::Geometry, Error> {
    Ok(land.albers.intersection(reach)?)
}

/// Explode a clipped reach geometry into connected components and keep only
/// those containing at least one seed stop. This removes exclaves: islands
/// the unclipped union happened to touch without any stop on them.
#[cfg(feature = "isochrone")]
pub fn components_containing(
    clipped: &geos::Geometry,
    seeds: &[Point<f64>],
) -> Result<Option<MultiPolygon<f64>>, Error> {
    let geometry = geo::Geometry::try_from(clipped)?;
    let mut components = Vec::new();
    flatten_polygons(geometry, &mut components);

    let kept: Vec<Polygon<f64>> = components
        .into_iter()
        .filter(|component| seeds.iter().any(|seed| component.contains(seed)))
        .collect();

    Ok((!kept.is_empty()).then(|| MultiPolygon::new(kept)))
}
