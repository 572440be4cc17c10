use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::data_structures::{Axis, Intersection, Lane, LightPair, Location};
use crate::error::TrafficError;

/// The two intersections the simulation boots with.
pub fn create_intersections(now: DateTime<Utc>) -> Result<Vec<Intersection>, TrafficError> {
    Ok(vec![
        Intersection::new(
            "A",
            Location {
                latitude: 26.4499,
                longitude: 80.3319,
            },
            LightPair::with_green(Axis::EastWest, now),
            vec![Lane::new("A_NS_IN", 10, 30)?, Lane::new("A_EW_IN", 25, 15)?],
            now,
        ),
        Intersection::new(
            "B",
            Location {
                latitude: 26.4550,
                longitude: 80.3400,
            },
            LightPair::with_green(Axis::NorthSouth, now),
            vec![Lane::new("B_NS_IN", 20, 20)?, Lane::new("B_EW_IN", 5, 40)?],
            now,
        ),
    ])
}

/// One row of a seed file: a lane plus the intersection it belongs to.
#[derive(Debug, Deserialize)]
struct SeedRow {
    intersection_id: String,
    latitude: f64,
    longitude: f64,
    green_axis: Axis,
    lane_id: String,
    vehicle_count: u32,
    average_speed: u32,
}

/// Loads a seed set from a CSV file, replacing the built-in intersections.
pub fn load_seed_file<P: AsRef<Path>>(
    path: P,
    now: DateTime<Utc>,
) -> Result<Vec<Intersection>, TrafficError> {
    let file = std::fs::File::open(path)?;
    parse_seed(file, now)
}

/// Groups seed rows by intersection id, keeping first-seen order.
/// Location and green axis are taken from the first row of each intersection.
pub fn parse_seed<R: Read>(reader: R, now: DateTime<Utc>) -> Result<Vec<Intersection>, TrafficError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut intersections: Vec<Intersection> = Vec::new();

    for result in rdr.deserialize() {
        let row: SeedRow = result?;
        let lane = Lane::new(&row.lane_id, row.vehicle_count, row.average_speed)?;

        match intersections.iter_mut().find(|i| i.id == row.intersection_id) {
            Some(intersection) => intersection.lanes.push(lane),
            None => intersections.push(Intersection::new(
                &row.intersection_id,
                Location {
                    latitude: row.latitude,
                    longitude: row.longitude,
                },
                LightPair::with_green(row.green_axis, now),
                vec![lane],
                now,
            )),
        }
    }

    if intersections.is_empty() {
        return Err(TrafficError::SeedFile("seed file has no rows".to_string()));
    }
    Ok(intersections)
}
