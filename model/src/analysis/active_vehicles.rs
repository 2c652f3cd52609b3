use gtfs::Time;

use crate::TickReport;

/// Samples how many vehicles are on the map as the simulation runs
#[derive(Clone, Debug)]
pub struct ActiveVehicleSampler {
    interval_seconds: f64,
    samples: Vec<(Time, usize)>,
}

impl ActiveVehicleSampler {
    pub fn new(interval_seconds: f64) -> Self {
        Self {
            interval_seconds,
            samples: Vec::new(),
        }
    }

    /// True if the tick produced a new sample
    pub fn observe(&mut self, report: &TickReport) -> bool {
        self.record(report.time, report.vehicle_count)
    }

    /// Keeps a sample once enough time has passed since the last one. Dropping to zero vehicles
    /// is always recorded.
    pub fn record(&mut self, time: Time, count: usize) -> bool {
        let due = match self.samples.last() {
            Some((last, _)) => time - *last >= self.interval_seconds || count == 0,
            None => true,
        };
        if due {
            self.samples.push((time, count));
        }
        due
    }

    pub fn samples(&self) -> &[(Time, usize)] {
        &self.samples
    }

    /// The earliest sample with the most vehicles
    pub fn peak(&self) -> Option<(Time, usize)> {
        self.samples
            .iter()
            .copied()
            .reduce(|best, x| if x.1 > best.1 { x } else { best })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
