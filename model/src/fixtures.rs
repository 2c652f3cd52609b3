//! Small hand-built feeds for tests

use gtfs::GTFS;

pub struct TestFeed {
    stops: String,
    routes: String,
    trips: String,
    shapes: String,
    stop_times: String,
}

impl TestFeed {
    pub fn new() -> Self {
        Self {
            stops: "stop_id,stop_name,stop_lat,stop_lon\n".to_string(),
            routes: "route_id,route_short_name,route_long_name,route_type\n".to_string(),
            trips: "route_id,service_id,trip_id,shape_id,block_id,direction_id\n".to_string(),
            shapes: "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n".to_string(),
            stop_times: "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n".to_string(),
        }
    }

    pub fn stop(mut self, id: &str, lon: f64, lat: f64) -> Self {
        self.stops += &format!("{id},Stop {id},{lat},{lon}\n");
        self
    }

    pub fn route(mut self, id: &str, route_type: u16, short_name: &str) -> Self {
        self.routes += &format!("{id},{short_name},,{route_type}\n");
        self
    }

    pub fn trip(
        mut self,
        id: &str,
        route: &str,
        shape: &str,
        block: Option<&str>,
        direction: Option<u8>,
    ) -> Self {
        let direction = direction.map(|d| d.to_string()).unwrap_or_default();
        self.trips += &format!(
            "{route},wk,{id},{shape},{},{direction}\n",
            block.unwrap_or("")
        );
        self
    }

    pub fn shape(mut self, id: &str, pts: &[(f64, f64)]) -> Self {
        for (idx, (lon, lat)) in pts.iter().enumerate() {
            self.shapes += &format!("{id},{lat},{lon},{}\n", idx + 1);
        }
        self
    }

    /// Stops in order, with the same arrival and departure time
    pub fn stop_times(mut self, trip: &str, stops: &[(&str, &str)]) -> Self {
        for (idx, (stop, time)) in stops.iter().enumerate() {
            self.stop_times += &format!("{trip},{time},{time},{stop},{}\n", idx + 1);
        }
        self
    }

    pub fn build(&self) -> GTFS {
        GTFS::load_from_tables(&[
            ("stops.txt", self.stops.as_str()),
            ("routes.txt", self.routes.as_str()),
            ("trips.txt", self.trips.as_str()),
            ("shapes.txt", self.shapes.as_str()),
            ("stop_times.txt", self.stop_times.as_str()),
        ])
        .unwrap()
    }
}

/// Two stops about 1km apart along the equator, served by one bus route with a straight shape
pub fn one_line() -> TestFeed {
    TestFeed::new()
        .stop("a", 0.0, 0.0)
        .stop("b", 0.009, 0.0)
        .route("r1", 3, "1")
        .shape("s1", &[(0.0, 0.0), (0.0045, 0.0), (0.009, 0.0)])
        .shape("s2", &[(0.009, 0.0), (0.0045, 0.0), (0.0, 0.0)])
}
