#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod filter;
mod ids;
mod lonlat;
mod routes;
mod shapes;
mod stop_times;
mod stops;
mod table;
mod time;
mod trips;

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

pub use filter::TripFilter;
pub use ids::{BlockID, RouteID, ServiceID, ShapeID, StopID, TripID};
pub use lonlat::{haversine_meters, LonLat, EARTH_RADIUS_METERS};
pub use routes::{Route, RouteType};
pub use shapes::{Shape, ShapePoint};
pub use stop_times::StopTime;
pub use stops::Stop;
pub use table::LoadError;
pub use time::Time;
pub use trips::Trip;

pub const TABLES: [&str; 5] = [
    "stops.txt",
    "routes.txt",
    "trips.txt",
    "shapes.txt",
    "stop_times.txt",
];

/// The static schedule, fully loaded and indexed. Nothing here changes once a simulation starts
/// using it.
#[derive(Clone, Serialize, Deserialize)]
pub struct GTFS {
    pub stops: BTreeMap<StopID, Stop>,
    pub routes: BTreeMap<RouteID, Route>,
    pub trips: BTreeMap<TripID, Trip>,
    pub shapes: BTreeMap<ShapeID, Shape>,
    /// Sorted by stop_sequence
    pub stop_times: BTreeMap<TripID, Vec<StopTime>>,

    // Derived indexes
    pub trip_start_times: BTreeMap<TripID, Time>,
    /// Every trip in the feed per block, ordered by start time
    pub blocks: BTreeMap<BlockID, Vec<TripID>>,
}

impl GTFS {
    /// Either a directory of tables or a zip archive
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Self::load_from_dir(path);
        }
        let file = fs_err::File::open(path)?;
        let mut archive = ZipArchive::new(std::io::BufReader::new(file))?;
        Self::load_from_zip(&mut archive)
    }

    /// Reads `stops.txt` and friends from a directory
    pub fn load_from_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::load(|table| {
            let file_path = path.join(table);
            if !file_path.exists() {
                return Ok(None);
            }
            let file = fs_err::File::open(file_path)?;
            Ok(Some(Box::new(std::io::BufReader::new(file)) as Box<dyn Read>))
        })
    }

    /// Tables can be at the root of the archive or inside one top-level directory
    pub fn load_from_zip<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let names: Vec<String> = archive.file_names().map(|x| x.to_string()).collect();
        Self::load(|table| {
            let name = match names
                .iter()
                .filter(|name| *name == table || name.ends_with(&format!("/{table}")))
                .min_by_key(|name| name.len())
            {
                Some(name) => name.clone(),
                None => return Ok(None),
            };
            let mut bytes = Vec::new();
            get_zip_file(archive, &name)?.read_to_end(&mut bytes)?;
            Ok(Some(Box::new(Cursor::new(bytes)) as Box<dyn Read>))
        })
    }

    /// Loads tables already in memory, as pairs of file name and contents
    pub fn load_from_tables(tables: &[(&str, &str)]) -> Result<Self> {
        Self::load(|table| {
            Ok(tables
                .iter()
                .find(|(name, _)| *name == table)
                .map(|(_, contents)| {
                    Box::new(Cursor::new(contents.as_bytes().to_vec())) as Box<dyn Read>
                }))
        })
    }

    /// `open` returns the contents of a table by file name, or None if the feed doesn't have it.
    pub fn load<F>(mut open: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> Result<Option<Box<dyn Read>>>,
    {
        let mut require = |table: &'static str| -> Result<Box<dyn Read>> {
            match open(table)? {
                Some(reader) => Ok(reader),
                None => Err(LoadError::MissingTable { table }.into()),
            }
        };

        let mut gtfs = Self::empty();
        gtfs.stops = stops::load(require("stops.txt")?)?;
        gtfs.routes = routes::load(require("routes.txt")?)?;
        gtfs.trips = trips::load(require("trips.txt")?)?;
        gtfs.shapes = shapes::load(require("shapes.txt")?)?;
        gtfs.stop_times = stop_times::load(require("stop_times.txt")?)?;
        gtfs.build_indexes();

        info!(
            "Loaded GTFS: {} stops, {} routes, {} trips, {} shapes, {} blocks",
            gtfs.stops.len(),
            gtfs.routes.len(),
            gtfs.trips.len(),
            gtfs.shapes.len(),
            gtfs.blocks.len()
        );
        Ok(gtfs)
    }

    pub fn empty() -> Self {
        Self {
            stops: BTreeMap::new(),
            routes: BTreeMap::new(),
            trips: BTreeMap::new(),
            shapes: BTreeMap::new(),
            stop_times: BTreeMap::new(),
            trip_start_times: BTreeMap::new(),
            blocks: BTreeMap::new(),
        }
    }

    fn build_indexes(&mut self) {
        let unknown_trips = self
            .stop_times
            .keys()
            .filter(|id| !self.trips.contains_key(id))
            .count();
        if unknown_trips > 0 {
            warn!("Stop times defined for {unknown_trips} unknown trips");
        }
        let unknown_stops = self
            .stop_times
            .values()
            .flatten()
            .filter(|st| !self.stops.contains_key(&st.stop_id))
            .count();
        if unknown_stops > 0 {
            warn!("{unknown_stops} stop times reference unknown stops");
        }
        let unknown_routes = self
            .trips
            .values()
            .filter(|t| !self.routes.contains_key(&t.route_id))
            .count();
        if unknown_routes > 0 {
            warn!("{unknown_routes} trips reference unknown routes");
        }

        self.trip_start_times.clear();
        for (trip_id, list) in &self.stop_times {
            if let Some(t) = stop_times::start_time(list) {
                self.trip_start_times.insert(trip_id.clone(), t);
            }
        }

        self.blocks.clear();
        for trip in self.trips.values() {
            if let Some(ref block_id) = trip.block_id {
                self.blocks
                    .entry(block_id.clone())
                    .or_default()
                    .push(trip.trip_id.clone());
            }
        }
        let start_times = &self.trip_start_times;
        for trips in self.blocks.values_mut() {
            // Trips without a start time sort last
            trips.sort_by_key(|id| (start_times.get(id).is_none(), start_times.get(id).copied()));
        }
    }

    pub fn route_for(&self, trip: &Trip) -> Option<&Route> {
        self.routes.get(&trip.route_id)
    }

    pub fn shape_for(&self, trip: &Trip) -> Option<&Shape> {
        trip.shape_id.as_ref().and_then(|id| self.shapes.get(id))
    }

    /// Empty if the trip has no stop times
    pub fn stop_times_for(&self, trip_id: &TripID) -> &[StopTime] {
        self.stop_times
            .get(trip_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    pub fn start_time(&self, trip_id: &TripID) -> Option<Time> {
        self.trip_start_times.get(trip_id).copied()
    }

    /// The stop served first, by stop_sequence
    pub fn first_stop(&self, trip_id: &TripID) -> Option<&Stop> {
        self.stop_times_for(trip_id)
            .first()
            .and_then(|st| self.stops.get(&st.stop_id))
    }

    pub fn last_stop(&self, trip_id: &TripID) -> Option<&Stop> {
        self.stop_times_for(trip_id)
            .last()
            .and_then(|st| self.stops.get(&st.stop_id))
    }

    /// Scheduled duration in seconds from the first departure to the last arrival
    pub fn travel_time(&self, trip_id: &TripID) -> Option<f64> {
        let list = self.stop_times_for(trip_id);
        if list.len() < 2 {
            return None;
        }
        let first = list[0].departure_time.or(list[0].arrival_time)?;
        let last = &list[list.len() - 1];
        let last = last.arrival_time.or(last.departure_time)?;
        Some(last - first)
    }

    /// Length in kilometers of the shape the trip follows; 0 if it has no usable shape.
    pub fn shape_length_km(&self, trip: &Trip) -> f64 {
        match self.shape_for(trip) {
            Some(shape) if shape.is_interpolable() => shape.length_km(),
            _ => 0.0,
        }
    }
}

// Adds the path in the error message
pub fn get_zip_file<'a, R: std::io::Read + std::io::Seek>(
    archive: &'a mut ZipArchive<R>,
    path: &str,
) -> Result<zip::read::ZipFile<'a>> {
    archive
        .by_name(path)
        .map_err(|err| anyhow!("{path}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;

    fn feed(tables: Vec<(&'static str, &'static str)>) -> Result<GTFS> {
        GTFS::load_from_tables(&tables)
    }

    fn sample() -> Vec<(&'static str, &'static str)> {
        vec![
            (
                "stops.txt",
                "stop_id,stop_name,stop_lat,stop_lon\na,Alpha,0.0,0.0\nb,Beta,0.0,0.01\n",
            ),
            (
                "routes.txt",
                "route_id,route_short_name,route_long_name,route_type\nr1,1,Main,3\n",
            ),
            (
                "trips.txt",
                "route_id,service_id,trip_id,shape_id,block_id\nr1,wk,t2,s1,b1\nr1,wk,t1,s1,b1\nr1,wk,t3,s1,\n",
            ),
            (
                "shapes.txt",
                "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\ns1,0.0,0.0,1\ns1,0.0,0.01,2\n",
            ),
            (
                "stop_times.txt",
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,08:00:00,08:00:00,a,1
t1,08:10:00,08:10:00,b,2
t2,09:00:00,09:00:00,b,1
t2,09:10:00,09:10:00,a,2
t3,07:00:00,07:00:00,a,1
t3,07:10:00,07:10:00,b,2
",
            ),
        ]
    }

    #[test]
    fn indexes() {
        let gtfs = feed(sample()).unwrap();
        assert_eq!(gtfs.start_time(&TripID::new("t2")), Some(Time::hms(9, 0, 0)));
        assert_eq!(
            gtfs.blocks[&BlockID::new("b1")],
            vec![TripID::new("t1"), TripID::new("t2")]
        );
        assert_eq!(gtfs.trips[&TripID::new("t3")].block_id, None);
        assert_eq!(
            gtfs.first_stop(&TripID::new("t2")).unwrap().stop_id,
            StopID::new("b")
        );
        assert_eq!(gtfs.travel_time(&TripID::new("t1")), Some(600.0));
    }

    #[test]
    fn missing_table() {
        let mut tables = sample();
        tables.retain(|(name, _)| *name != "shapes.txt");
        let err = feed(tables).err().unwrap();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MissingTable {
                table: "shapes.txt"
            })
        );
    }

    #[test]
    fn missing_required_column_names_the_table() {
        let mut tables = sample();
        tables[2] = ("trips.txt", "route_id,trip_id\nr1,t1\n");
        let err = feed(tables).err().unwrap();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MissingColumn {
                table: "trips.txt",
                column: "service_id"
            })
        );
    }

    #[test]
    fn filter_by_route_label_and_service() {
        let gtfs = feed(sample()).unwrap();
        let mut filter = TripFilter::everything();
        assert_eq!(filter.apply(&gtfs).len(), 3);

        filter.route_names = Some(vec!["1 - Main".to_string()].into_iter().collect());
        filter.route_types = Some(vec![RouteType::Bus].into_iter().collect());
        assert_eq!(filter.apply(&gtfs).len(), 3);

        filter.service_ids = Some(vec![ServiceID::new("sat")].into_iter().collect());
        assert!(filter.apply(&gtfs).is_empty());
    }

    fn zipped(entries: Vec<(String, &str)>) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer.start_file(name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        ZipArchive::new(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn zip_with_tables_at_the_root() {
        let entries = sample()
            .into_iter()
            .map(|(name, contents)| (name.to_string(), contents))
            .collect();
        let gtfs = GTFS::load_from_zip(&mut zipped(entries)).unwrap();
        assert_eq!(gtfs.trips.len(), 3);
        assert_eq!(gtfs.travel_time(&TripID::new("t1")), Some(600.0));
    }

    #[test]
    fn zip_with_tables_in_a_directory() {
        let mut entries: Vec<(String, &str)> = sample()
            .into_iter()
            .map(|(name, contents)| (format!("feed/{name}"), contents))
            .collect();
        // The shortest matching name wins
        entries.push((
            "feed/old/stops.txt".to_string(),
            "stop_id,stop_lat,stop_lon
zzz,1.0,1.0
",
        ));
        let gtfs = GTFS::load_from_zip(&mut zipped(entries)).unwrap();
        assert_eq!(gtfs.stops.len(), 2);
        assert!(gtfs.stops.contains_key(&StopID::new("a")));
        assert_eq!(
            gtfs.blocks[&BlockID::new("b1")],
            vec![TripID::new("t1"), TripID::new("t2")]
        );
    }

    #[test]
    fn zip_missing_table() {
        let entries = sample()
            .into_iter()
            .filter(|(name, _)| *name != "stop_times.txt")
            .map(|(name, contents)| (name.to_string(), contents))
            .collect();
        let err = GTFS::load_from_zip(&mut zipped(entries)).err().unwrap();
        assert_eq!(
            err.downcast_ref::<LoadError>(),
            Some(&LoadError::MissingTable {
                table: "stop_times.txt"
            })
        );
    }
}
