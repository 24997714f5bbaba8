/*!
Feed preprocessing.

Reduces loaded GTFS tables to the four persisted artifacts for one service
day. This is a pure function of the feed and the `service_id`; rerunning it
on the same input produces identical artifacts.

Network edges come from consecutive same-trip rows of `stop_times`: the
table is sorted by `(trip_id, stop_sequence)` and paired row-to-next-row, so
each pair is one in-vehicle hop with duration `next_arrival − arrival`.
Rows with null times, negative durations or self-loops are skipped with a
warning; the query layer never sees them.
*/

use hashbrown::HashMap;
use itertools::{izip, Itertools};
use polars::chunked_array::ops::SortMultipleOptions;
use polars::prelude::*;

use crate::artifacts::{
    Artifacts, EdgeKey, NetworkEdge, ShapeLine, ShapeSpan, StopRecord, TripTime, TRANSFER_KIND,
};
use crate::loaders::GtfsFeed;
use crate::Error;

/// Fallback route short name for the rapid-transit lines, which the feed
/// publishes without one.
const FALLBACK_SHORT_NAME: &str = "Skytrain";

/// Build all four artifacts for one service day
/// (`1` weekday, `2` Saturday, `3` Sunday).
pub fn build_artifacts(feed: &GtfsFeed, service_id: i64) -> Result<Artifacts, Error> {
    let network_edges = build_network_edges(feed, service_id)?;
    let transfer_edges = build_transfer_edges(&feed.transfers)?;
    let stops = build_stops(&feed.stops)?;
    let shapes = build_shapes(&feed.shapes)?;

    log::info!(
        "preprocessed service {service_id}: {} network edges, {} transfers, {} stops, {} shapes",
        network_edges.len(),
        transfer_edges.len(),
        stops.len(),
        shapes.len()
    );

    Ok(Artifacts {
        network_edges,
        transfer_edges,
        stops,
        shapes,
    })
}

fn build_network_edges(
    feed: &GtfsFeed,
    service_id: i64,
) -> Result<HashMap<EdgeKey, NetworkEdge>, Error> {
    let trips = feed.trips.filter(
        &feed
            .trips
            .column("service_id")?
            .cast(&DataType::Int64)?
            .equal(service_id)?,
    )?;
    let trips = trips.select(["trip_id", "route_id", "shape_id"])?;

    let routes = feed
        .routes
        .select(["route_id", "route_short_name", "route_long_name"])?;

    let mut joined = feed.stop_times.join(
        &trips,
        ["trip_id"],
        ["trip_id"],
        JoinArgs::new(JoinType::Inner),
    )?;
    joined = joined.join(
        &routes,
        ["route_id"],
        ["route_id"],
        JoinArgs::new(JoinType::Inner),
    )?;

    let route_names = derive_route_names(&joined)?;
    joined.with_column(route_names)?;

    if joined.column("shape_dist_traveled").is_err() {
        joined.with_column(Column::full_null(
            "shape_dist_traveled".into(),
            joined.height(),
            &DataType::Float64,
        ))?;
    }

    let sorted = joined.sort(["trip_id", "stop_sequence"], SortMultipleOptions::default())?;

    let trip_ids = sorted.column("trip_id")?.str()?;
    let stop_ids = sorted.column("stop_id")?.str()?;
    let arrivals = sorted.column("arrival_time")?.cast(&DataType::UInt32)?;
    let arrivals = arrivals.u32()?;
    let dists = sorted
        .column("shape_dist_traveled")?
        .cast(&DataType::Float64)?;
    let dists = dists.f64()?;
    let shape_ids = sorted.column("shape_id")?.str()?;
    let route_names = sorted.column("route_name")?.str()?;

    let rows = izip!(
        trip_ids.iter(),
        stop_ids.iter(),
        arrivals.iter(),
        dists.iter(),
        shape_ids.iter(),
        route_names.iter()
    );

    let mut edges: HashMap<EdgeKey, NetworkEdge> = HashMap::new();

    for (row, next) in rows.tuple_windows() {
        let (trip, stop, arrival, dist, shape, route) = row;
        let (next_trip, next_stop, next_arrival, next_dist, _, _) = next;

        // Only consecutive rows of the same trip form an in-vehicle hop.
        if trip.is_none() || trip != next_trip {
            continue;
        }

        let (Some(u), Some(v), Some(route)) = (stop, next_stop, route) else {
            log::warn!("stop_times row for trip {trip:?} is missing identifiers, skipped");
            continue;
        };
        let (Some(arrival), Some(next_arrival)) = (arrival, next_arrival) else {
            log::warn!("unparseable arrival time on trip {}, hop {u} -> {v} skipped", trip.unwrap_or(""));
            continue;
        };
        if u == v {
            log::warn!("self-loop at stop {u} in trip {}, skipped", trip.unwrap_or(""));
            continue;
        }
        if next_arrival < arrival {
            log::warn!(
                "negative duration on {u} -> {v} (route {route}), skipped"
            );
            continue;
        }

        let key = (u.to_string(), v.to_string(), route.to_string());
        let edge = edges.entry(key).or_insert_with(|| NetworkEdge {
            // The span is fixed by the first observation; sources that later
            // disagree only contribute their departures.
            span: match (shape, dist, next_dist) {
                (Some(shape_id), Some(dist_u), Some(dist_v))
                    if dist_u.is_finite() && dist_v.is_finite() =>
                {
                    Some(ShapeSpan {
                        shape_id: shape_id.to_string(),
                        dist_u,
                        dist_v,
                    })
                }
                _ => None,
            },
            trips: Vec::new(),
        });
        edge.trips.push(TripTime {
            dept_sec: arrival,
            dur_sec: next_arrival - arrival,
        });
    }

    Ok(edges)
}

/// `route_short_name` (or the Skytrain fallback) concatenated with
/// `route_long_name`, the routing key for the whole engine. Two trips with
/// the same derived name are one logical service.
fn derive_route_names(df: &DataFrame) -> Result<Column, Error> {
    let short = df.column("route_short_name")?.str()?;
    let long = df.column("route_long_name")?.str()?;

    let names: StringChunked = short
        .iter()
        .zip(long.iter())
        .map(|(short, long)| {
            Some(format!(
                "{}{}",
                short.unwrap_or(FALLBACK_SHORT_NAME),
                long.unwrap_or("")
            ))
        })
        .collect();

    Ok(names.with_name("route_name".into()).into_column())
}

/// Walking transfers. The feed's `min_transfer_time` overestimates walking
/// for this network, so it is halved; null times become 0 and duplicate
/// pairs keep the minimum.
fn build_transfer_edges(transfers: &DataFrame) -> Result<HashMap<EdgeKey, f64>, Error> {
    let from = transfers.column("from_stop_id")?.str()?;
    let to = transfers.column("to_stop_id")?.str()?;
    let times = transfers
        .column("min_transfer_time")?
        .cast(&DataType::Float64)?;
    let times = times.f64()?;

    let mut edges: HashMap<EdgeKey, f64> = HashMap::new();

    for (u, v, secs) in izip!(from.iter(), to.iter(), times.iter()) {
        let (Some(u), Some(v)) = (u, v) else {
            log::warn!("transfer row with missing stop ids skipped");
            continue;
        };
        let halved = secs.unwrap_or(0.0) / 2.0;
        edges
            .entry((u.to_string(), v.to_string(), TRANSFER_KIND.to_string()))
            .and_modify(|existing| *existing = existing.min(halved))
            .or_insert(halved);
    }

    Ok(edges)
}

fn build_stops(stops: &DataFrame) -> Result<HashMap<String, StopRecord>, Error> {
    let stop_ids = stops.column("stop_id")?.str()?.iter();
    let names = stops.column("stop_name")?.str()?.iter();
    let lats = stops.column("stop_lat")?.f64()?.iter();
    let lons = stops.column("stop_lon")?.f64()?.iter();

    let mut registry = HashMap::new();

    for (stop_id, (name, (lat, lon))) in stop_ids.zip(names.zip(lats.zip(lons))) {
        let stop_id = stop_id.ok_or_else(|| Error::MissingValue("stop_id".to_string()))?;
        let lat = lat.ok_or_else(|| Error::MissingValue("stop_lat".to_string()))?;
        let lon = lon.ok_or_else(|| Error::MissingValue("stop_lon".to_string()))?;

        registry.insert(
            stop_id.to_string(),
            StopRecord {
                name: name.unwrap_or(stop_id).to_string(),
                lat,
                lon,
            },
        );
    }

    Ok(registry)
}

/// Shape points sorted by cumulative distance into parallel arrays.
fn build_shapes(shapes: &DataFrame) -> Result<HashMap<String, ShapeLine>, Error> {
    let sorted = shapes.sort(
        ["shape_id", "shape_dist_traveled"],
        SortMultipleOptions::default(),
    )?;

    let shape_ids = sorted.column("shape_id")?.str()?;
    let lats = sorted.column("shape_pt_lat")?.f64()?;
    let lons = sorted.column("shape_pt_lon")?.f64()?;
    let dists = sorted
        .column("shape_dist_traveled")?
        .cast(&DataType::Float64)?;
    let dists = dists.f64()?;

    let mut lines: HashMap<String, ShapeLine> = HashMap::new();

    for (shape_id, lat, lon, dist) in izip!(shape_ids.iter(), lats.iter(), lons.iter(), dists.iter())
    {
        let (Some(shape_id), Some(lat), Some(lon), Some(dist)) = (shape_id, lat, lon, dist) else {
            log::warn!("shape row with missing values skipped");
            continue;
        };
        if !dist.is_finite() {
            log::warn!("non-finite shape_dist_traveled on shape {shape_id}, point skipped");
            continue;
        }

        let line = lines.entry(shape_id.to_string()).or_default();
        line.dists.push(dist);
        line.coords.push((lon, lat));
    }

    Ok(lines)
}
