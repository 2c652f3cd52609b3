use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::table::read_rows;
use crate::{BlockID, RouteID, ServiceID, ShapeID, TripID};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: TripID,
    /// Resolved through `GTFS::routes`; may dangle if routes.txt doesn't define it
    pub route_id: RouteID,
    pub service_id: ServiceID,
    pub shape_id: Option<ShapeID>,
    /// Trips sharing a block are presumed to be served by one vehicle, one after another
    pub block_id: Option<BlockID>,
    /// 0 or 1 in GTFS. The meaning of each direction is up to the agency.
    pub direction_id: Option<u8>,
}

pub fn load<R: Read>(reader: R) -> Result<BTreeMap<TripID, Trip>> {
    let mut trips = BTreeMap::new();
    let rows = read_rows::<_, Record>(
        "trips.txt",
        reader,
        &["trip_id", "route_id", "service_id"],
    )?;
    for rec in rows {
        let (trip_id, route_id, service_id) = match (rec.trip_id, rec.route_id, rec.service_id) {
            (Some(t), Some(r), Some(s)) => (t, r, s),
            (t, _, _) => {
                debug!("trips.txt: skipping incomplete row for {:?}", t);
                continue;
            }
        };
        if trips.contains_key(&trip_id) {
            warn!("trips.txt: duplicate {trip_id}, keeping the first");
            continue;
        }
        trips.insert(
            trip_id.clone(),
            Trip {
                trip_id,
                route_id,
                service_id,
                shape_id: rec.shape_id,
                block_id: rec.block_id,
                direction_id: rec.direction_id,
            },
        );
    }
    Ok(trips)
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    trip_id: Option<TripID>,
    #[serde(default)]
    route_id: Option<RouteID>,
    #[serde(default)]
    service_id: Option<ServiceID>,
    #[serde(default)]
    shape_id: Option<ShapeID>,
    #[serde(default)]
    block_id: Option<BlockID>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    direction_id: Option<u8>,
}
