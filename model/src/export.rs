use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson};

use crate::{Assignment, Simulation};

impl Simulation<'_> {
    /// Every vehicle on the map as a point, with its trip and route
    pub fn export_vehicles_to_geojson(&self) -> Result<String> {
        let gtfs = self.gtfs();
        let mut features = Vec::new();
        for vehicle in self.vehicles() {
            if !vehicle.pos.is_valid() {
                continue;
            }
            let (trip, laying_over) = match vehicle.assignment {
                Assignment::Serving(ref trip) => (trip, false),
                Assignment::LayingOver(ref trip) => (trip, true),
            };
            let mut feature = Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                    vehicle.pos.longitude(),
                    vehicle.pos.latitude(),
                ]))),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("vehicle", vehicle.id.0);
            feature.set_property("trip", trip.to_string());
            feature.set_property("laying_over", laying_over);
            if let Some(route) = gtfs.trips.get(trip).and_then(|t| gtfs.route_for(t)) {
                feature.set_property("route", route.label());
            }
            features.push(feature);
        }

        let mut foreign_members = serde_json::Map::new();
        if let Some(time) = self.time() {
            foreign_members.insert("time".to_string(), time.to_string().into());
        }
        let gj = GeoJson::FeatureCollection(FeatureCollection {
            features,
            bbox: None,
            foreign_members: Some(foreign_members),
        });
        Ok(serde_json::to_string_pretty(&gj)?)
    }
}
