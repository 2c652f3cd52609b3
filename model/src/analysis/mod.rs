//! Readers of simulation output and of the filtered schedule. Nothing here changes the
//! simulation.

mod accessibility;
mod active_vehicles;
mod headway;
mod route_stats;
mod vehicle_km;

pub use accessibility::{accessibility_score, stop_score, AccessibilityScore, StopContribution};
pub use active_vehicles::ActiveVehicleSampler;
pub use headway::{HeadwayEstimator, HourlyHeadway};
pub use route_stats::{export_to_csv, route_stats, RouteStats};
pub use vehicle_km::VehicleKmByRoute;
