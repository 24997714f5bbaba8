//! Interactive terminal front-end.
//!
//! Walks the user through the full query flow: service day, departure time,
//! origin, time budget, then an optional destination for turn-by-turn
//! routing. Results land as GeoJSON under `output/`. An empty line at any
//! prompt exits.

use std::io::{self, Write};
use std::path::PathBuf;

use geo::{Contains, Point};
use geojson::{Feature, FeatureCollection, GeoJson};
use inlet_core::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let gtfs_dir = args.next().unwrap_or_else(|| "data/gtfs".to_string());
    let land_path = args.next().unwrap_or_else(|| "data/land.geojson".to_string());
    let artifacts_dir = PathBuf::from("agg_data");
    let output_dir = PathBuf::from("output");

    let projector = Projector::new()?;
    let land = LandMask::from_geojson_file(&land_path, &projector)?;

    // DAY SELECTION
    let service_id = loop {
        let Some(input) = prompt("Please enter a day of the week or press Enter to exit:")? else {
            return Ok(());
        };
        match service_day(&input.to_lowercase()) {
            Some(id) => break id,
            None => println!("Invalid entry. Please try again."),
        }
    };

    let feed = GtfsFeed::read(&gtfs_dir)?;
    let artifacts = build_artifacts(&feed, service_id)?;
    artifacts.save(&artifacts_dir)?;
    let index = StopIndex::build(&artifacts.stops);

    // TIME SELECTION
    let graph = loop {
        let Some(input) = prompt("Please enter a time of day in format HH:MM or press Enter to exit:")?
        else {
            return Ok(());
        };
        match TransitGraph::build(&artifacts, &GraphParams::new(input)) {
            Ok(graph) => break graph,
            Err(Error::InvalidTime(_)) => {
                println!("Invalid format or time. Please use HH:MM (e.g., 14:30).");
            }
            Err(other) => return Err(other.into()),
        }
    };

    // ORIGIN SELECTION
    let origin = loop {
        let Some(input) = prompt("Enter Lat, Lon (e.g., 49.2, -123.1) or press Enter to exit:")?
        else {
            return Ok(());
        };
        match parse_coords(&input) {
            Some(point) if land.contains(&point) => break point,
            Some(_) => println!("Error: Those coordinates are outside the region or not on land."),
            None => println!("Invalid format. Use 'Lat, Lon' in numeric degrees."),
        }
    };

    // BUDGET SELECTION
    let walk = WalkParams::default();
    let polygon = loop {
        let Some(input) =
            prompt("Enter your time budget (an integer between 1 and 30, inclusive) or press Enter to exit:")?
        else {
            return Ok(());
        };
        let Ok(budget) = input.parse::<u32>() else {
            println!("Error: Try again.");
            continue;
        };
        if !(1..=30).contains(&budget) {
            println!("Invalid budget. Please try again.");
            continue;
        }

        match isochrone(
            &graph,
            &artifacts,
            &index,
            &land,
            &projector,
            origin,
            f64::from(budget),
            &walk,
        )? {
            Some(polygon) => {
                std::fs::create_dir_all(&output_dir)?;
                let path = output_dir.join("isochrone.geojson");
                std::fs::write(&path, multipolygon_geojson(&polygon).to_string())?;
                println!("Saved {}.", path.display());
                break polygon;
            }
            None => println!("Failed to generate polygon."),
        }
    };

    // ROUTE SELECTION
    loop {
        let Some(input) = prompt(
            "To route somewhere within your isochrone, enter the coordinates. Otherwise, press Enter to exit:",
        )?
        else {
            return Ok(());
        };
        let Some(destination) = parse_coords(&input) else {
            println!("Invalid format. Use 'Lat, Lon' in numeric degrees.");
            continue;
        };
        if !polygon.contains(&destination) {
            println!("Error: Those coordinates are not within the isochrone.");
            continue;
        }

        match route(&graph, &artifacts, &index, origin, destination, &walk)? {
            Some(plan) => {
                for step in &plan.steps {
                    println!("  {step}");
                }
                println!("Total time: {:.1} min", plan.total_mins);
                let path = output_dir.join("route.geojson");
                std::fs::write(&path, plan.to_geojson().to_string())?;
                println!("Saved {}.", path.display());
                return Ok(());
            }
            None => println!("No route found. Try different coordinates."),
        }
    }
}

fn service_day(day: &str) -> Option<i64> {
    match day {
        "monday" | "tuesday" | "wednesday" | "thursday" | "friday" => Some(1),
        "saturday" => Some(2),
        "sunday" => Some(3),
        _ => None,
    }
}

fn prompt(message: &str) -> io::Result<Option<String>> {
    println!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        println!("Exiting program...");
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn parse_coords(input: &str) -> Option<Point<f64>> {
    let (lat, lon) = input.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some(Point::new(lon, lat))
}

fn multipolygon_geojson(polygon: &geo::MultiPolygon<f64>) -> GeoJson {
    let feature = Feature {
        geometry: Some(geojson::Geometry::new(geojson::Value::from(polygon))),
        properties: None,
        id: None,
        bbox: None,
        foreign_members: None,
    };
    GeoJson::FeatureCollection(FeatureCollection {
        features: vec![feature],
        bbox: None,
        foreign_members: None,
    })
}
