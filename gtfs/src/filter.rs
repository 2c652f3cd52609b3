use std::collections::BTreeSet;

use crate::{RouteType, ServiceID, Trip, TripID, GTFS};

/// Chooses which trips take part in a simulation run. Each present set must contain the trip's
/// value; an absent set matches everything.
#[derive(Clone, Debug, Default)]
pub struct TripFilter {
    pub route_types: Option<BTreeSet<RouteType>>,
    /// Matched against `Route::label`
    pub route_names: Option<BTreeSet<String>>,
    pub service_ids: Option<BTreeSet<ServiceID>>,
}

impl TripFilter {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn matches(&self, gtfs: &GTFS, trip: &Trip) -> bool {
        let route = gtfs.routes.get(&trip.route_id);
        if let Some(ref types) = self.route_types {
            match route.and_then(|r| r.route_type) {
                Some(rt) if types.contains(&rt) => {}
                _ => return false,
            }
        }
        if let Some(ref names) = self.route_names {
            match route {
                Some(r) if names.contains(&r.label()) => {}
                _ => return false,
            }
        }
        if let Some(ref services) = self.service_ids {
            if !services.contains(&trip.service_id) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, gtfs: &GTFS) -> Vec<TripID> {
        gtfs.trips
            .values()
            .filter(|trip| self.matches(gtfs, trip))
            .map(|trip| trip.trip_id.clone())
            .collect()
    }
}
