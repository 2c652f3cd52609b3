use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::table::read_rows;
use crate::{LonLat, ShapeID};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapePoint {
    pub pos: LonLat,
    pub sequence: f64,
    pub dist_traveled: Option<f64>,
}

/// The physical path of a route. Points are sorted by sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shape {
    pub shape_id: ShapeID,
    pub points: Vec<ShapePoint>,
}

impl Shape {
    /// A shape needs at least 2 points before anything can move along it
    pub fn is_interpolable(&self) -> bool {
        self.points.len() >= 2
    }

    /// If every point has shape_dist_traveled, the largest value, taken as kilometers.
    /// Otherwise the sum of great-circle distances between consecutive points.
    pub fn length_km(&self) -> f64 {
        let traveled: Option<Vec<f64>> = self.points.iter().map(|pt| pt.dist_traveled).collect();
        match traveled {
            Some(values) if !values.is_empty() => values.into_iter().fold(0.0, f64::max),
            _ => self.gps_length_meters() / 1000.0,
        }
    }

    /// Points whose coordinates failed to parse are skipped.
    pub fn gps_length_meters(&self) -> f64 {
        let pts: Vec<LonLat> = self
            .points
            .iter()
            .map(|pt| pt.pos)
            .filter(|pos| pos.is_valid())
            .collect();
        pts.windows(2).map(|pair| pair[0].gps_dist(pair[1])).sum()
    }
}

pub fn load<R: Read>(reader: R) -> Result<BTreeMap<ShapeID, Shape>> {
    let rows = read_rows::<_, Record>(
        "shapes.txt",
        reader,
        &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
    )?;

    let mut pts_per_shape: BTreeMap<ShapeID, Vec<ShapePoint>> = BTreeMap::new();
    let mut unordered = 0;
    let mut any_dist_traveled = false;
    for rec in rows {
        let shape_id = match rec.shape_id {
            Some(id) => id,
            None => continue,
        };
        // Without a sequence there's no way to place the point
        let sequence = match rec.shape_pt_sequence {
            Some(x) if x.is_finite() => x,
            _ => {
                unordered += 1;
                continue;
            }
        };
        any_dist_traveled |= rec.shape_dist_traveled.is_some();
        pts_per_shape.entry(shape_id).or_default().push(ShapePoint {
            pos: LonLat::new(
                rec.shape_pt_lon.unwrap_or(f64::NAN),
                rec.shape_pt_lat.unwrap_or(f64::NAN),
            ),
            sequence,
            dist_traveled: rec.shape_dist_traveled,
        });
    }
    if unordered > 0 {
        warn!("shapes.txt: dropped {unordered} points without a usable shape_pt_sequence");
    }
    if !any_dist_traveled {
        info!("shapes.txt: no shape_dist_traveled values; lengths are computed from geometry");
    }

    // Sort by shape_pt_sequence, in case the file isn't in order
    let mut results = BTreeMap::new();
    for (shape_id, mut points) in pts_per_shape {
        points.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));
        results.insert(shape_id.clone(), Shape { shape_id, points });
    }
    Ok(results)
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    shape_id: Option<ShapeID>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shape_pt_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shape_pt_lon: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shape_pt_sequence: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shape_dist_traveled: Option<f64>,
}
