//! Replays a GTFS schedule as moving vehicles. Each trip's shape is stamped with times from its
//! stop times, a clock advances over the service day, and vehicles are handed from trip to trip
//! within a block when the connection is plausible.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod analysis;
mod blocks;
mod config;
mod export;
#[cfg(test)]
mod fixtures;
mod path;
mod sim;
mod vehicles;

pub use self::blocks::{BlockChains, ChainDecision};
pub use self::config::{ChainingThresholds, SimConfig};
pub use self::path::{TimedPathPoint, TripPath};
pub use self::sim::{SimState, Simulation, TickReport, TripFinished};
pub use self::vehicles::{Assignment, Vehicle, VehicleID, VehicleRegistry};
