use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use anyhow::Result;
use gtfs::{Time, TripID, GTFS};
use model::analysis::{ActiveVehicleSampler, HeadwayEstimator, VehicleKmByRoute};
use model::{SimState, Simulation, TickReport};

use crate::commands::{self, Command};

pub struct Snapshot {
    pub at: Time,
    pub path: String,
}

/// Drives a configured simulation, either at a real-time cadence with commands from stdin or as
/// fast as possible. Commands only take effect between ticks.
pub struct Driver<'a> {
    gtfs: &'a GTFS,
    trips: &'a [TripID],
    headless: bool,
    snapshot: Option<Snapshot>,

    sampler: ActiveVehicleSampler,
    vehicle_km: VehicleKmByRoute,
    headways: HeadwayEstimator,
    current_hour: Option<usize>,
}

impl<'a> Driver<'a> {
    pub fn new(
        gtfs: &'a GTFS,
        trips: &'a [TripID],
        sample_interval_seconds: f64,
        headless: bool,
        snapshot: Option<Snapshot>,
    ) -> Self {
        Self {
            gtfs,
            trips,
            headless,
            snapshot,
            sampler: ActiveVehicleSampler::new(sample_interval_seconds),
            vehicle_km: VehicleKmByRoute::new(),
            headways: HeadwayEstimator::new(gtfs),
            current_hour: None,
        }
    }

    pub fn run(&mut self, sim: &mut Simulation) -> Result<()> {
        let commands = if self.headless {
            None
        } else {
            info!("Commands: p (pause), r (resume), s (stop), + / - (speed), speed N");
            Some(commands::spawn_stdin_reader())
        };
        let frame = Duration::from_millis(sim.config().frame_interval_ms);

        sim.start()?;
        loop {
            if let Some(ref rx) = commands {
                apply_pending(rx, sim);
            }
            match sim.state() {
                SimState::Idle => {
                    info!("Stopped");
                    break;
                }
                SimState::Paused => {
                    std::thread::sleep(frame);
                    continue;
                }
                SimState::Ready => sim.start()?,
                SimState::Running => {}
            }

            let report = sim.tick()?;
            self.observe(sim, &report)?;
            if report.done {
                break;
            }
            if !self.headless {
                std::thread::sleep(frame);
            }
        }

        self.summarize();
        Ok(())
    }

    fn observe(&mut self, sim: &Simulation, report: &TickReport) -> Result<()> {
        for ev in &report.finished {
            debug!(
                "{} finished at {} after {:.2}km",
                ev.trip, ev.end_time, ev.distance_km
            );
        }
        self.vehicle_km.observe(report);
        if self.sampler.observe(report) {
            info!("{}: {} vehicles", report.time, report.vehicle_count);
        }

        let hour = report.time.hour();
        if self.current_hour != Some(hour) {
            self.current_hour = Some(hour);
            for estimate in self.headways.estimate(self.gtfs, self.trips, hour) {
                info!(
                    "Hour {}: {} runs every {:.1} minutes{}",
                    hour,
                    self.route_label(&estimate.route),
                    estimate.headway_minutes,
                    if estimate.one_directional {
                        " (one direction only)"
                    } else {
                        ""
                    }
                );
            }
        }

        let due = match self.snapshot {
            Some(ref snapshot) => report.time >= snapshot.at,
            None => false,
        };
        if due {
            if let Some(snapshot) = self.snapshot.take() {
                fs_err::write(&snapshot.path, sim.export_vehicles_to_geojson()?)?;
                info!(
                    "Wrote {} vehicle positions at {} to {}",
                    report.vehicle_count, report.time, snapshot.path
                );
            }
        }
        Ok(())
    }

    fn summarize(&self) {
        if let Some((time, count)) = self.sampler.peak() {
            info!("Peak of {} vehicles at {}", count, time);
        }
        for (idx, (route, km)) in self.vehicle_km.leaders(5).into_iter().enumerate() {
            info!(
                "#{} by vehicle-km: {} with {:.1}km",
                idx + 1,
                self.route_label(&route),
                km
            );
        }
        if let Some(ref snapshot) = self.snapshot {
            warn!(
                "The simulation ended before {}, so {} wasn't written",
                snapshot.at, snapshot.path
            );
        }
    }

    fn route_label(&self, route: &gtfs::RouteID) -> String {
        self.gtfs
            .routes
            .get(route)
            .map(|r| r.label())
            .unwrap_or_else(|| route.to_string())
    }
}

fn apply_pending(rx: &Receiver<Command>, sim: &mut Simulation) {
    loop {
        match rx.try_recv() {
            Ok(cmd) => apply(cmd, sim),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
        }
    }
}

fn apply(cmd: Command, sim: &mut Simulation) {
    let speed = sim.config().speed_multiplier;
    let result = match cmd {
        Command::Pause => {
            sim.pause();
            info!("Paused at {}", display_time(sim));
            Ok(())
        }
        Command::Resume => {
            sim.resume();
            Ok(())
        }
        Command::Stop => {
            sim.stop();
            Ok(())
        }
        Command::Faster => sim.set_speed(speed * 2.0),
        Command::Slower => sim.set_speed(speed / 2.0),
        Command::Speed(x) => sim.set_speed(x),
    };
    match result {
        Ok(()) => {
            if sim.config().speed_multiplier != speed {
                info!("Speed is now {}x", sim.config().speed_multiplier);
            }
        }
        Err(err) => warn!("{}", err),
    }
}

fn display_time(sim: &Simulation) -> String {
    sim.time()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string())
}
