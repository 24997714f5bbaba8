/*!
GTFS table loading.

Reads the delimited feed tables into polars `DataFrame`s. Identifier columns
are force-cast to strings (leading zeros in `stop_id` are significant) and
`HH:MM:SS` time columns are parsed into nullable seconds-since-midnight,
where `HH` may exceed 23 for post-midnight service. An unparseable time
yields a null that propagates; the preprocessor later drops such rows.
*/

use std::path::{Path, PathBuf};

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;

use crate::Error;

/// The six raw feed tables.
pub struct GtfsFeed {
    pub trips: DataFrame,
    pub stop_times: DataFrame,
    pub stops: DataFrame,
    pub routes: DataFrame,
    pub transfers: DataFrame,
    pub shapes: DataFrame,
}

impl GtfsFeed {
    /// Load a feed directory. Tables may carry either the GTFS `.txt`
    /// extension or `.csv`. A missing table is fatal.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();

        let mut trips = read_table(dir, "trips")?;
        let mut stop_times = read_table(dir, "stop_times")?;
        let mut stops = read_table(dir, "stops")?;
        let mut routes = read_table(dir, "routes")?;
        let mut transfers = read_table(dir, "transfers")?;
        let mut shapes = read_table(dir, "shapes")?;

        for name in ["trip_id", "route_id", "shape_id"] {
            cast_to_string(&mut trips, name)?;
        }
        for name in ["trip_id", "stop_id"] {
            cast_to_string(&mut stop_times, name)?;
        }
        cast_to_string(&mut stops, "stop_id")?;
        for name in ["route_id", "route_short_name", "route_long_name"] {
            cast_to_string(&mut routes, name)?;
        }
        for name in ["from_stop_id", "to_stop_id"] {
            cast_to_string(&mut transfers, name)?;
        }
        cast_to_string(&mut shapes, "shape_id")?;

        stop_times.apply("arrival_time", hhmmss_to_sec)?;

        log::info!(
            "loaded feed from {}: {} trips, {} stop_times, {} stops",
            dir.display(),
            trips.height(),
            stop_times.height(),
            stops.height()
        );

        Ok(GtfsFeed {
            trips,
            stop_times,
            stops,
            routes,
            transfers,
            shapes,
        })
    }
}

fn read_table(dir: &Path, name: &str) -> Result<DataFrame, Error> {
    let txt = dir.join(format!("{name}.txt"));
    let path = if txt.exists() {
        txt
    } else {
        dir.join(format!("{name}.csv"))
    };
    read_csv(path)
}

fn read_csv(file_path: PathBuf) -> Result<DataFrame, Error> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        // Wide inference window protects against wrong schema inference on
        // columns that start numeric and turn textual later in the file.
        .with_infer_schema_length(Some(10000))
        .try_into_reader_with_file_path(Some(file_path))?
        .finish()?;

    Ok(df)
}

/// Replace a column with its `String` cast. Missing columns are left alone;
/// the preprocessor supplies nulls where it can tolerate their absence.
fn cast_to_string(df: &mut DataFrame, name: &str) -> Result<(), Error> {
    if let Ok(column) = df.column(name) {
        let cast = column.cast(&DataType::String)?;
        df.with_column(cast)?;
    }
    Ok(())
}

/// Column kernel mapping `HH:MM:SS` strings to seconds since midnight.
/// Malformed values become nulls.
fn hhmmss_to_sec(col: &Column) -> Column {
    col.str()
        .unwrap_or_else(|_| {
            panic!("invalid time format for {}. Expected HH:MM:SS", col.name())
        })
        .iter()
        .map(|opt_time: Option<&str>| opt_time.and_then(parse_hhmmss))
        .collect::<UInt32Chunked>()
        .into_column()
}

/// Parse `HH:MM:SS` into seconds since midnight. `HH` may exceed 23.
pub fn parse_hhmmss(time: &str) -> Option<u32> {
    let mut parts = time.split(':');
    let hours = parts.next()?.trim().parse::<u32>().ok()?;
    let minutes = parts.next()?.trim().parse::<u32>().ok()?;
    let seconds = parts.next()?.trim().parse::<u32>().ok()?;
    if parts.next().is_some() || minutes > 59 || seconds > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Parse a query-time `HH:MM` literal into seconds since midnight.
pub fn parse_hhmm(time: &str) -> Result<u32, Error> {
    let invalid = || Error::InvalidTime(time.to_string());
    let (hours, minutes) = time.trim().split_once(':').ok_or_else(invalid)?;
    let hours = hours.parse::<u32>().map_err(|_| invalid())?;
    let minutes = minutes.parse::<u32>().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 3600 + minutes * 60)
}
