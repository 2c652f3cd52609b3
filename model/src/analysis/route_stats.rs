use std::collections::BTreeMap;

use anyhow::Result;
use gtfs::{ShapeID, Stop, Trip, TripID, GTFS};
use serde::Serialize;

/// One row per route and shape variant
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteStats {
    #[serde(rename = "Route Name")]
    pub route_name: String,
    #[serde(rename = "Shape ID")]
    pub shape_id: Option<ShapeID>,
    #[serde(rename = "First Station")]
    pub first_station: String,
    #[serde(rename = "Last Station")]
    pub last_station: String,
    #[serde(rename = "Distance (km)")]
    pub distance_km: f64,
    #[serde(rename = "Trip Count")]
    pub trip_count: usize,
    /// Travel times in minutes. Empty when no trip has two timed stops.
    #[serde(rename = "Shortest (min)")]
    pub shortest: Option<f64>,
    #[serde(rename = "Average (min)")]
    pub average: Option<f64>,
    #[serde(rename = "Longest (min)")]
    pub longest: Option<f64>,
}

pub fn route_stats(gtfs: &GTFS, trips: &[TripID]) -> Vec<RouteStats> {
    let mut groups: BTreeMap<(String, Option<ShapeID>), Vec<&Trip>> = BTreeMap::new();
    for trip in trips.iter().filter_map(|id| gtfs.trips.get(id)) {
        let route_name = gtfs
            .route_for(trip)
            .map(|r| r.display_name())
            .unwrap_or_else(|| trip.route_id.to_string());
        groups
            .entry((route_name, trip.shape_id.clone()))
            .or_default()
            .push(trip);
    }

    let mut rows = Vec::new();
    for ((route_name, shape_id), trips) in groups {
        let distance_km = round(gtfs.shape_length_km(trips[0]), 3);

        let station = |stop: Option<&Stop>| stop.and_then(|s| s.name.clone()).unwrap_or_default();
        let first_station = station(gtfs.first_stop(&trips[0].trip_id));
        let last_station = station(gtfs.last_stop(&trips[0].trip_id));

        let minutes: Vec<f64> = trips
            .iter()
            .filter_map(|trip| gtfs.travel_time(&trip.trip_id))
            .map(|secs| secs / 60.0)
            .collect();
        let (shortest, average, longest) = if minutes.is_empty() {
            (None, None, None)
        } else {
            let min = minutes.iter().copied().fold(f64::INFINITY, f64::min);
            let max = minutes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = minutes.iter().sum::<f64>() / minutes.len() as f64;
            (Some(round(min, 1)), Some(round(avg, 1)), Some(round(max, 1)))
        };

        rows.push(RouteStats {
            route_name,
            shape_id,
            first_station,
            last_station,
            distance_km,
            trip_count: trips.len(),
            shortest,
            average,
            longest,
        });
    }
    rows
}

pub fn export_to_csv(rows: &[RouteStats]) -> Result<String> {
    let mut out = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    let out = String::from_utf8(out)?;
    Ok(out)
}

fn round(x: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (x * scale).round() / scale
}
