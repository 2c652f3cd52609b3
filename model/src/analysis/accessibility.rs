use std::collections::{BTreeMap, BTreeSet};

use gtfs::{LonLat, ShapeID, StopID, Time, TripID, GTFS};
use serde::Serialize;

pub const SEARCH_RADIUS_METERS: f64 = 1000.0;
const FREQUENCY_DECAY: f64 = 0.18;
const FULL_SERVICE_HOURS: f64 = 18.0;
const WALK_DECAY_METERS: f64 = 150.0;
const BUSIEST_HOURS: usize = 6;

/// How one route variant serving a location contributes to its score
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopContribution {
    pub shape: ShapeID,
    /// The closest stop on this shape
    pub stop: StopID,
    pub distance_meters: f64,
    /// Average departures over the busiest hours
    pub frequency: f64,
    pub service_hours: usize,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccessibilityScore {
    /// From 0 to 100
    pub score: f64,
    pub contributions: Vec<StopContribution>,
}

/// Frequent, all-day service close by scores near 1
pub fn stop_score(frequency: f64, service_hours: f64, distance_meters: f64) -> f64 {
    (1.0 - (-FREQUENCY_DECAY * frequency).exp())
        * (service_hours / FULL_SERVICE_HOURS).min(1.0)
        * (-distance_meters / WALK_DECAY_METERS).exp()
}

/// Scores how well a location is served by these trips. Each shape passing within walking
/// distance counts once, at its closest stop. Two stops with a bus every 5 minutes all day,
/// 150m away, make a perfect score.
pub fn accessibility_score(gtfs: &GTFS, trips: &[TripID], pos: LonLat) -> AccessibilityScore {
    // Departures per stop, by the shape of the trip
    let mut departures: BTreeMap<&StopID, BTreeMap<&ShapeID, Vec<Time>>> = BTreeMap::new();
    let trips: BTreeSet<&TripID> = trips.iter().collect();
    for trip in trips.into_iter().filter_map(|id| gtfs.trips.get(id)) {
        let shape = match trip.shape_id {
            Some(ref shape) => shape,
            None => continue,
        };
        for st in gtfs.stop_times_for(&trip.trip_id) {
            if let Some(time) = st.time() {
                departures
                    .entry(&st.stop_id)
                    .or_default()
                    .entry(shape)
                    .or_default()
                    .push(time);
            }
        }
    }

    let mut closest: BTreeMap<&ShapeID, (&StopID, f64)> = BTreeMap::new();
    for (stop_id, shapes) in &departures {
        let dist = match gtfs.stops.get(*stop_id) {
            Some(stop) if stop.pos.is_valid() => pos.gps_dist(stop.pos),
            _ => continue,
        };
        if dist.is_nan() || dist > SEARCH_RADIUS_METERS {
            continue;
        }
        for shape in shapes.keys() {
            if closest.get(shape).map_or(true, |(_, best)| dist < *best) {
                closest.insert(*shape, (*stop_id, dist));
            }
        }
    }

    let mut contributions = Vec::new();
    for (shape, (stop, distance_meters)) in closest {
        let times = &departures[stop][shape];
        let mut per_hour: BTreeMap<usize, usize> = BTreeMap::new();
        for time in times {
            *per_hour.entry(time.hour()).or_insert(0) += 1;
        }
        let mut counts: Vec<usize> = per_hour.values().copied().collect();
        counts.sort_by(|a, b| b.cmp(a));
        counts.truncate(BUSIEST_HOURS);
        let frequency = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let service_hours = per_hour.len();

        contributions.push(StopContribution {
            shape: shape.clone(),
            stop: stop.clone(),
            distance_meters,
            frequency,
            service_hours,
            score: stop_score(frequency, service_hours as f64, distance_meters),
        });
    }

    let total: f64 = contributions.iter().map(|c| c.score).sum();
    let perfect = 2.0 * stop_score(12.0, FULL_SERVICE_HOURS, WALK_DECAY_METERS);
    let score = 100.0 * (total / perfect).min(1.0);
    debug!(
        "Accessibility at {}: {} shapes nearby, score {:.1}",
        pos,
        contributions.len(),
        score
    );
    AccessibilityScore {
        score,
        contributions,
    }
}
