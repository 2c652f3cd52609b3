use std::collections::BTreeMap;

use gtfs::{RouteID, ShapeID, TripID, GTFS};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlyHeadway {
    pub route: RouteID,
    pub hour: usize,
    /// Trips starting this hour, with short-turn trips counted partially
    pub trips_per_hour: f64,
    /// 0 when nothing runs
    pub headway_minutes: f64,
    /// Only one direction ran this hour
    pub one_directional: bool,
}

/// Estimates how often each route runs, hour by hour. A trip on a shorter variant of a route
/// counts as the fraction of the route's usual length it covers.
pub struct HeadwayEstimator {
    /// Length of the most common shape per route and direction
    usual_length_km: BTreeMap<(RouteID, Option<u8>), f64>,
    has_direction: bool,
}

impl HeadwayEstimator {
    /// Learns the usual shape of every route from the whole feed
    pub fn new(gtfs: &GTFS) -> Self {
        let mut counts: BTreeMap<(RouteID, Option<u8>), BTreeMap<Option<&ShapeID>, usize>> =
            BTreeMap::new();
        for trip in gtfs.trips.values() {
            *counts
                .entry((trip.route_id.clone(), trip.direction_id))
                .or_default()
                .entry(trip.shape_id.as_ref())
                .or_insert(0) += 1;
        }

        let mut usual_length_km = BTreeMap::new();
        for (key, shapes) in counts {
            let mut best: Option<(Option<&ShapeID>, usize)> = None;
            for (shape, count) in shapes {
                if best.map_or(true, |(_, max)| count > max) {
                    best = Some((shape, count));
                }
            }
            let length = best
                .and_then(|(shape, _)| shape)
                .and_then(|id| gtfs.shapes.get(id))
                .filter(|shape| shape.is_interpolable())
                .map(|shape| shape.length_km())
                .filter(|km| *km > 0.0)
                .unwrap_or(1.0);
            usual_length_km.insert(key, length);
        }

        Self {
            usual_length_km,
            has_direction: gtfs.trips.values().any(|t| t.direction_id.is_some()),
        }
    }

    /// Whether any trip in the feed has a direction. Without one, every trip on a route is
    /// counted together, which overestimates frequency on two-way routes.
    pub fn has_direction(&self) -> bool {
        self.has_direction
    }

    /// One entry per route with at least one of these trips starting in the hour
    pub fn estimate(&self, gtfs: &GTFS, trips: &[TripID], hour: usize) -> Vec<HourlyHeadway> {
        let mut per_route: BTreeMap<&RouteID, BTreeMap<Option<u8>, f64>> = BTreeMap::new();
        for trip in trips.iter().filter_map(|id| gtfs.trips.get(id)) {
            match gtfs.start_time(&trip.trip_id) {
                Some(start) if start.hour() == hour => {}
                _ => continue,
            }
            let direction = if self.has_direction {
                trip.direction_id
            } else {
                None
            };
            let usual = self
                .usual_length_km
                .get(&(trip.route_id.clone(), trip.direction_id))
                .copied()
                .unwrap_or(1.0);
            let length = gtfs.shape_length_km(trip);
            let weight = if length >= usual { 1.0 } else { length / usual };
            *per_route
                .entry(&trip.route_id)
                .or_default()
                .entry(direction)
                .or_insert(0.0) += weight;
        }

        let mut results = Vec::new();
        for (route, directions) in per_route {
            let total: f64 = directions.values().sum();
            let (trips_per_hour, one_directional) = if !self.has_direction {
                (total, false)
            } else if directions.len() == 1 {
                (total, true)
            } else {
                (total / directions.len() as f64, false)
            };
            results.push(HourlyHeadway {
                route: route.clone(),
                hour,
                trips_per_hour,
                headway_minutes: if trips_per_hour > 0.0 {
                    60.0 / trips_per_hour
                } else {
                    0.0
                },
                one_directional,
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fixtures::one_line;

    #[test]
    fn both_directions_are_averaged() {
        let gtfs = one_line()
            .shape("short", &[(0.0, 0.0), (0.0045, 0.0)])
            .trip("out1", "r1", "s1", None, Some(0))
            .trip("out2", "r1", "s1", None, Some(0))
            .trip("out3", "r1", "short", None, Some(0))
            .trip("back1", "r1", "s2", None, Some(1))
            .trip("late", "r1", "s2", None, Some(1))
            .stop_times("out1", &[("a", "08:00:00"), ("b", "08:10:00")])
            .stop_times("out2", &[("a", "08:30:00"), ("b", "08:40:00")])
            .stop_times("out3", &[("a", "08:45:00"), ("b", "08:50:00")])
            .stop_times("back1", &[("b", "08:15:00"), ("a", "08:25:00")])
            .stop_times("late", &[("b", "09:15:00"), ("a", "09:25:00")])
            .build();
        let estimator = HeadwayEstimator::new(&gtfs);
        assert!(estimator.has_direction());
        let ids: Vec<TripID> = gtfs.trips.keys().cloned().collect();

        let result = estimator.estimate(&gtfs, &ids, 8);
        assert_eq!(result.len(), 1);
        // Outbound is 2.5 trips, inbound 1
        assert_relative_eq!(result[0].trips_per_hour, 1.75, epsilon = 1e-9);
        assert_relative_eq!(result[0].headway_minutes, 60.0 / 1.75, epsilon = 1e-9);
        assert!(!result[0].one_directional);

        let result = estimator.estimate(&gtfs, &ids, 9);
        assert_eq!(result[0].trips_per_hour, 1.0);
        assert!(result[0].one_directional);

        assert!(estimator.estimate(&gtfs, &ids, 10).is_empty());
    }

    #[test]
    fn without_directions_trips_are_summed() {
        let gtfs = one_line()
            .trip("out", "r1", "s1", None, None)
            .trip("back", "r1", "s2", None, None)
            .stop_times("out", &[("a", "08:00:00"), ("b", "08:10:00")])
            .stop_times("back", &[("b", "08:15:00"), ("a", "08:25:00")])
            .build();
        let estimator = HeadwayEstimator::new(&gtfs);
        assert!(!estimator.has_direction());
        let ids: Vec<TripID> = gtfs.trips.keys().cloned().collect();
        let result = estimator.estimate(&gtfs, &ids, 8);
        assert_eq!(result[0].trips_per_hour, 2.0);
        assert_eq!(result[0].headway_minutes, 30.0);
        assert!(!result[0].one_directional);
    }
}
