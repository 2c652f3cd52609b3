use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::table::read_rows;
use crate::{LonLat, StopID};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopID,
    pub name: Option<String>,
    pub pos: LonLat,
}

pub fn load<R: Read>(reader: R) -> Result<BTreeMap<StopID, Stop>> {
    let mut stops = BTreeMap::new();
    let mut duplicates = 0;
    for rec in read_rows::<_, Record>("stops.txt", reader, &["stop_id", "stop_lat", "stop_lon"])? {
        let stop_id = match rec.stop_id {
            Some(id) => id,
            None => continue,
        };
        if stops.contains_key(&stop_id) {
            duplicates += 1;
            continue;
        }
        stops.insert(
            stop_id.clone(),
            Stop {
                stop_id,
                name: rec.stop_name,
                pos: LonLat::new(
                    rec.stop_lon.unwrap_or(f64::NAN),
                    rec.stop_lat.unwrap_or(f64::NAN),
                ),
            },
        );
    }
    if duplicates > 0 {
        warn!("stops.txt: ignored {duplicates} duplicate stop_ids");
    }
    Ok(stops)
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    stop_id: Option<StopID>,
    #[serde(default)]
    stop_name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lon: Option<f64>,
}
