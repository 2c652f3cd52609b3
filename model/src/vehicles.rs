use std::collections::BTreeMap;

use anyhow::Result;
use gtfs::{LonLat, TripID};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleID(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Assignment {
    Serving(TripID),
    /// Finished a trip and reserved for the next one in its block
    LayingOver(TripID),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleID,
    pub pos: LonLat,
    pub assignment: Assignment,
}

/// Owns every vehicle on the map. A vehicle is owned by exactly one trip at a time, either one
/// it's serving or the one it's laying over for.
#[derive(Clone, Debug, Default)]
pub struct VehicleRegistry {
    vehicles: BTreeMap<VehicleID, Vehicle>,
    waiting: BTreeMap<TripID, VehicleID>,
    next_id: usize,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, pos: LonLat, trip: TripID) -> VehicleID {
        let id = VehicleID(self.next_id);
        self.next_id += 1;
        self.vehicles.insert(
            id,
            Vehicle {
                id,
                pos,
                assignment: Assignment::Serving(trip),
            },
        );
        id
    }

    /// Moves a vehicle from the trip it just finished to the next trip, parking it at `pos`
    /// until that trip starts.
    pub fn hand_off(&mut self, id: VehicleID, next: TripID, pos: LonLat) -> Result<()> {
        if let Some(other) = self.waiting.get(&next) {
            bail!("{} already has {:?} waiting", next, other);
        }
        let vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no {:?}", id))?;
        vehicle.pos = pos;
        vehicle.assignment = Assignment::LayingOver(next.clone());
        self.waiting.insert(next, id);
        Ok(())
    }

    /// Takes the vehicle reserved for this trip, if any, and starts it serving the trip.
    pub fn claim(&mut self, trip: &TripID) -> Option<VehicleID> {
        let id = self.waiting.remove(trip)?;
        let vehicle = self.vehicles.get_mut(&id)?;
        vehicle.assignment = Assignment::Serving(trip.clone());
        Some(id)
    }

    pub fn move_to(&mut self, id: VehicleID, pos: LonLat) {
        if let Some(vehicle) = self.vehicles.get_mut(&id) {
            vehicle.pos = pos;
        }
    }

    pub fn release(&mut self, id: VehicleID) -> Option<Vehicle> {
        let vehicle = self.vehicles.remove(&id)?;
        if let Assignment::LayingOver(ref trip) = vehicle.assignment {
            self.waiting.remove(trip);
        }
        Some(vehicle)
    }

    pub fn get(&self, id: VehicleID) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Includes vehicles laying over
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Forgets everything. IDs start over from 0.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
