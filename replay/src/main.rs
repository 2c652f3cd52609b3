#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod commands;
mod driver;

use std::collections::BTreeSet;

use anyhow::Result;
use structopt::StructOpt;

use gtfs::{LonLat, RouteType, ServiceID, Time, TripFilter, GTFS};
use model::analysis::{accessibility_score, export_to_csv, route_stats};
use model::{SimConfig, Simulation};

use self::driver::{Driver, Snapshot};

#[derive(StructOpt)]
#[structopt(about = "Replays a GTFS schedule as moving vehicles")]
struct Args {
    /// The path to a GTFS directory or zip file
    #[structopt(long)]
    gtfs: String,
    /// A JSON file with simulation settings. Anything missing takes the default.
    #[structopt(long)]
    config: Option<String>,
    /// Only simulate routes with this route_type code. Can be repeated.
    #[structopt(long = "route-type")]
    route_types: Vec<u16>,
    /// Only simulate routes with this name, like "10 - Downtown". Can be repeated.
    #[structopt(long = "route")]
    routes: Vec<String>,
    /// Only simulate trips with this service_id. Can be repeated.
    #[structopt(long = "service")]
    services: Vec<String>,
    /// Speed multiplier; overrides the config file
    #[structopt(long)]
    speed: Option<f64>,
    /// Run as fast as possible, ignoring stdin
    #[structopt(long)]
    headless: bool,
    /// Write route statistics for the selected trips to this CSV file
    #[structopt(long)]
    stats: Option<String>,
    /// Score transit access around "lon,lat" for the selected trips
    #[structopt(long, parse(try_from_str = parse_lon_lat))]
    score_at: Option<LonLat>,
    /// When to capture vehicle positions, as HH:MM:SS
    #[structopt(long, parse(try_from_str = parse_time), requires = "snapshot-out")]
    snapshot_at: Option<Time>,
    /// Where to write the GeoJSON snapshot
    #[structopt(long, requires = "snapshot-at")]
    snapshot_out: Option<String>,
    /// Show debug messages
    #[structopt(short, long)]
    verbose: bool,
}

impl Args {
    fn filter(&self) -> TripFilter {
        fn set<T: Ord, I: IntoIterator<Item = T>>(items: I) -> Option<BTreeSet<T>> {
            let set: BTreeSet<T> = items.into_iter().collect();
            if set.is_empty() {
                None
            } else {
                Some(set)
            }
        }

        TripFilter {
            route_types: set(self.route_types.iter().map(|x| RouteType::from_code(*x))),
            route_names: set(self.routes.iter().cloned()),
            service_ids: set(self.services.iter().map(ServiceID::new)),
        }
    }

    fn config(&self) -> Result<SimConfig> {
        let mut config = match self.config {
            Some(ref path) => SimConfig::from_json(&fs_err::read_to_string(path)?)?,
            None => SimConfig::default(),
        };
        if let Some(speed) = self.speed {
            config.speed_multiplier = speed;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_time(raw: &str) -> Result<Time> {
    Time::parse(raw).ok_or_else(|| anyhow!("{} isn't HH:MM:SS", raw))
}

fn parse_lon_lat(raw: &str) -> Result<LonLat> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        bail!("{} isn't lon,lat", raw);
    }
    let pos = LonLat::new(parts[0].trim().parse()?, parts[1].trim().parse()?);
    if !pos.is_valid() {
        bail!("{} isn't lon,lat", raw);
    }
    Ok(pos)
}

fn main() -> Result<()> {
    let args = Args::from_args();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    let config = args.config()?;
    let gtfs = GTFS::load_from_path(&args.gtfs)?;
    let trips = args.filter().apply(&gtfs);
    info!("{} of {} trips selected", trips.len(), gtfs.trips.len());

    if let Some(ref path) = args.stats {
        let rows = route_stats(&gtfs, &trips);
        fs_err::write(path, export_to_csv(&rows)?)?;
        info!("Wrote {} rows of route statistics to {}", rows.len(), path);
    }
    if let Some(pos) = args.score_at {
        let result = accessibility_score(&gtfs, &trips, pos);
        for c in &result.contributions {
            info!(
                "  {} via {}: {:.0}m away, {:.1} departures/hour over {} hours, score {:.4}",
                c.shape, c.stop, c.distance_meters, c.frequency, c.service_hours, c.score
            );
        }
        info!("Transit accessibility at {}: {:.1}", pos, result.score);
    }

    let snapshot = match (args.snapshot_at, args.snapshot_out.clone()) {
        (Some(at), Some(path)) => Some(Snapshot { at, path }),
        _ => None,
    };
    let mut driver = Driver::new(
        &gtfs,
        &trips,
        config.sample_interval_seconds,
        args.headless,
        snapshot,
    );
    let mut sim = Simulation::new(&gtfs, config);
    sim.configure(&trips)?;
    driver.run(&mut sim)
}
