use std::collections::BTreeSet;

use anyhow::Result;
use gtfs::{RouteID, Time, TripID, GTFS};
use serde::Serialize;

use crate::{
    BlockChains, ChainDecision, SimConfig, TimedPathPoint, TripPath, Vehicle, VehicleID,
    VehicleRegistry,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SimState {
    Idle,
    /// Configured with trips, clock set to the earliest start, not ticking yet
    Ready,
    Running,
    Paused,
}

#[derive(Clone, Debug, Serialize)]
pub struct TripFinished {
    pub trip: TripID,
    pub route: RouteID,
    pub vehicle: VehicleID,
    pub distance_km: f64,
    pub end_time: Time,
    /// The next trip in the block, if the vehicle goes on to serve it
    pub continues_as: Option<TripID>,
}

/// What happened during one tick
#[derive(Clone, Debug, Serialize)]
pub struct TickReport {
    pub time: Time,
    pub started: Vec<(TripID, VehicleID)>,
    pub finished: Vec<TripFinished>,
    /// Every vehicle on the map, including those laying over between trips
    pub vehicle_count: usize,
    /// Nothing is left to run, and the simulation went back to idle
    pub done: bool,
}

struct ActiveTrip {
    trip: TripID,
    route: RouteID,
    path: TripPath,
    vehicle: VehicleID,
}

/// Replays the schedule for a set of trips. Each tick advances the clock, starts trips that are
/// due, finishes trips that are done (chaining their vehicle to the next trip in the block when
/// plausible), then moves every vehicle along its path.
pub struct Simulation<'a> {
    gtfs: &'a GTFS,
    config: SimConfig,
    state: SimState,
    time: Option<Time>,

    pending: BTreeSet<(Time, TripID)>,
    active: Vec<ActiveTrip>,
    chains: BlockChains,
    vehicles: VehicleRegistry,
}

impl<'a> Simulation<'a> {
    pub fn new(gtfs: &'a GTFS, config: SimConfig) -> Self {
        Self {
            gtfs,
            config,
            state: SimState::Idle,
            time: None,
            pending: BTreeSet::new(),
            active: Vec::new(),
            chains: BlockChains::default(),
            vehicles: VehicleRegistry::new(),
        }
    }

    /// Discards any previous run and prepares to simulate these trips. Trips without stop times
    /// are skipped.
    pub fn configure(&mut self, trips: &[TripID]) -> Result<()> {
        self.stop();
        if trips.is_empty() {
            bail!("No trips match the filters");
        }

        let mut pending = BTreeSet::new();
        for id in trips {
            if !self.gtfs.trips.contains_key(id) {
                warn!("Unknown trip {}, skipping", id);
                continue;
            }
            match self.gtfs.start_time(id) {
                Some(start) => {
                    pending.insert((start, id.clone()));
                }
                None => debug!("{} has no usable stop times, skipping", id),
            }
        }
        let first = match pending.iter().next() {
            Some((start, _)) => *start,
            None => bail!("None of the {} trips have valid stop times", trips.len()),
        };

        let runnable: Vec<TripID> = pending.iter().map(|(_, id)| id.clone()).collect();
        self.chains = BlockChains::build(self.gtfs, &runnable);
        info!(
            "Ready to simulate {} trips ({} blocks), starting at {}",
            runnable.len(),
            self.chains.blocks().len(),
            first
        );
        self.pending = pending;
        self.time = Some(first);
        self.state = SimState::Ready;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SimState::Idle => bail!("Nothing to run; configure some trips first"),
            SimState::Ready | SimState::Paused => {
                self.state = SimState::Running;
            }
            SimState::Running => {}
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == SimState::Running {
            self.state = SimState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SimState::Paused {
            self.state = SimState::Running;
        }
    }

    /// Removes every vehicle and forgets all trips.
    pub fn stop(&mut self) {
        self.state = SimState::Idle;
        self.time = None;
        self.pending.clear();
        self.active.clear();
        self.chains = BlockChains::default();
        self.vehicles.clear();
    }

    /// Takes effect on the next tick
    pub fn set_speed(&mut self, multiplier: f64) -> Result<()> {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            bail!("Speed multiplier must be positive, not {}", multiplier);
        }
        self.config.speed_multiplier = multiplier;
        Ok(())
    }

    pub fn tick(&mut self) -> Result<TickReport> {
        if self.state != SimState::Running {
            bail!("Can't tick while {:?}", self.state);
        }
        let time = self
            .time
            .ok_or_else(|| anyhow!("Running without a clock"))?
            + self.config.step_seconds * self.config.speed_multiplier;
        self.time = Some(time);

        let mut report = TickReport {
            time,
            started: Vec::new(),
            finished: Vec::new(),
            vehicle_count: 0,
            done: false,
        };

        while self
            .pending
            .first()
            .map_or(false, |(start, _)| *start <= time)
        {
            if let Some((_, id)) = self.pending.pop_first() {
                self.activate(id, &mut report);
            }
        }

        let mut still_active = Vec::new();
        for active in std::mem::take(&mut self.active) {
            match active.path.last() {
                Some(end) if time >= end.time => self.finish(active, end, &mut report),
                _ => still_active.push(active),
            }
        }

        for active in &still_active {
            if let Some(pos) = active.path.position_at(time) {
                self.vehicles.move_to(active.vehicle, pos);
            }
        }
        self.active = still_active;
        report.vehicle_count = self.vehicles.len();

        if self.pending.is_empty() && self.active.is_empty() {
            info!("All trips finished at {}", time);
            self.stop();
            report.done = true;
        }
        Ok(report)
    }

    fn activate(&mut self, id: TripID, report: &mut TickReport) {
        let gtfs = self.gtfs;
        let trip = match gtfs.trips.get(&id) {
            Some(trip) => trip,
            None => return,
        };
        let path = TripPath::for_trip(gtfs, trip);
        let first = match path.first() {
            Some(pt) => pt,
            None => {
                debug!("{} has no path to follow, skipping", id);
                // A vehicle laying over for this trip has nothing to do
                if let Some(vehicle) = self.vehicles.claim(&id) {
                    self.vehicles.release(vehicle);
                }
                return;
            }
        };

        let vehicle = match self.vehicles.claim(&id) {
            Some(vehicle) => {
                self.vehicles.move_to(vehicle, first.pos);
                vehicle
            }
            None => self.vehicles.allocate(first.pos, id.clone()),
        };
        report.started.push((id.clone(), vehicle));
        self.active.push(ActiveTrip {
            trip: id,
            route: trip.route_id.clone(),
            path,
            vehicle,
        });
    }

    fn finish(&mut self, active: ActiveTrip, end: TimedPathPoint, report: &mut TickReport) {
        let gtfs = self.gtfs;
        let distance_km = gtfs
            .trips
            .get(&active.trip)
            .map(|trip| gtfs.shape_length_km(trip))
            .unwrap_or(0.0);

        let pending = &self.pending;
        let decision = self.chains.decide(
            gtfs,
            &self.config.chaining,
            &active.trip,
            end,
            |id| {
                gtfs.start_time(id)
                    .map_or(false, |start| pending.contains(&(start, id.clone())))
            },
        );

        let continues_as = match decision {
            ChainDecision::Continue {
                next,
                start_pos,
                deadhead_meters,
                layover_seconds,
            } => match self.vehicles.hand_off(active.vehicle, next.clone(), start_pos) {
                Ok(()) => {
                    debug!(
                        "{:?} continues from {} to {} ({:.0}m, {:.0}s layover)",
                        active.vehicle, active.trip, next, deadhead_meters, layover_seconds
                    );
                    Some(next)
                }
                Err(err) => {
                    warn!("Can't chain {} to {}: {}", active.trip, next, err);
                    None
                }
            },
            ChainDecision::Implausible {
                next,
                deadhead_meters,
                layover_seconds,
            } => {
                let block = gtfs
                    .trips
                    .get(&active.trip)
                    .and_then(|t| t.block_id.as_ref())
                    .map(|b| b.to_string())
                    .unwrap_or_default();
                warn!(
                    "Block {}: not chaining {} to {}, {:.0}m deadhead in a {:.1} minute layover",
                    block,
                    active.trip,
                    next,
                    deadhead_meters,
                    layover_seconds / 60.0
                );
                None
            }
            ChainDecision::NoStartPosition(next) => {
                debug!("Not chaining {} to {}: no start position", active.trip, next);
                None
            }
            ChainDecision::EndOfBlock | ChainDecision::Unavailable(_) => None,
        };
        if continues_as.is_none() {
            self.vehicles.release(active.vehicle);
        }

        report.finished.push(TripFinished {
            trip: active.trip,
            route: active.route,
            vehicle: active.vehicle,
            distance_km,
            end_time: end.time,
            continues_as,
        });
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// None when idle
    pub fn time(&self) -> Option<Time> {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn gtfs(&self) -> &'a GTFS {
        self.gtfs
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    pub fn vehicle(&self, id: VehicleID) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Trips currently being served, in the order they started
    pub fn active_trips(&self) -> impl Iterator<Item = (&TripID, VehicleID)> {
        self.active.iter().map(|a| (&a.trip, a.vehicle))
    }
}
