use std::collections::BTreeMap;

use gtfs::{RouteID, Time};

use crate::{TickReport, TripFinished};

/// Cumulative vehicle-kilometres driven per route, counted when each trip finishes
#[derive(Clone, Debug, Default)]
pub struct VehicleKmByRoute {
    series: BTreeMap<RouteID, Vec<(Time, f64)>>,
}

impl VehicleKmByRoute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, report: &TickReport) {
        let mut finished: Vec<&TripFinished> = report.finished.iter().collect();
        finished.sort_by_key(|ev| ev.end_time);
        for ev in finished {
            self.record(&ev.route, ev.end_time, ev.distance_km);
        }
    }

    pub fn record(&mut self, route: &RouteID, time: Time, distance_km: f64) {
        let series = self.series.entry(route.clone()).or_default();
        let total = series.last().map(|(_, km)| *km).unwrap_or(0.0) + distance_km;
        series.push((time, total));
    }

    pub fn total(&self, route: &RouteID) -> f64 {
        self.series(route).last().map(|(_, km)| *km).unwrap_or(0.0)
    }

    pub fn series(&self, route: &RouteID) -> &[(Time, f64)] {
        self.series.get(route).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// The `n` routes with the most kilometres so far, most first
    pub fn leaders(&self, n: usize) -> Vec<(RouteID, f64)> {
        let mut totals: Vec<(RouteID, f64)> = self
            .series
            .keys()
            .map(|route| (route.clone(), self.total(route)))
            .collect();
        totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        totals.truncate(n);
        totals
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::VehicleID;

    fn finished(route: &str, end_time: Time, distance_km: f64) -> TripFinished {
        TripFinished {
            trip: gtfs::TripID::new(format!("{route}-{end_time}")),
            route: RouteID::new(route),
            vehicle: VehicleID(0),
            distance_km,
            end_time,
            continues_as: None,
        }
    }

    #[test]
    fn cumulative_per_route() {
        let mut km = VehicleKmByRoute::new();
        km.observe(&TickReport {
            time: Time::hms(8, 10, 0),
            started: Vec::new(),
            finished: vec![
                finished("r1", Time::hms(8, 10, 0), 2.0),
                finished("r2", Time::hms(8, 9, 55), 1.5),
                finished("r1", Time::hms(8, 9, 52), 3.0),
            ],
            vehicle_count: 0,
            done: false,
        });
        km.record(&RouteID::new("r2"), Time::hms(9, 0, 0), 0.25);

        let r1 = km.series(&RouteID::new("r1"));
        assert_eq!(r1[0].0, Time::hms(8, 9, 52));
        assert_relative_eq!(r1[1].1, 5.0);
        assert_relative_eq!(km.total(&RouteID::new("r2")), 1.75);
        assert_eq!(km.total(&RouteID::new("r3")), 0.0);

        let leaders = km.leaders(1);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].0, RouteID::new("r1"));
    }
}
