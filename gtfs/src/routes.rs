use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::table::read_rows;
use crate::RouteID;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteID,
    pub route_type: Option<RouteType>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RouteType {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Furnicular,
    Trolleybus,
    Monorail,
    /// Extended route types (like 700 for bus service) and anything else unrecognized
    Other(u16),
}

impl RouteType {
    pub fn from_code(code: u16) -> Self {
        use RouteType::*;
        match code {
            0 => Tram,
            1 => Subway,
            2 => Rail,
            3 => Bus,
            4 => Ferry,
            5 => CableTram,
            6 => AerialLift,
            7 => Furnicular,
            11 => Trolleybus,
            12 => Monorail,
            x => Other(x),
        }
    }

    pub fn code(self) -> u16 {
        use RouteType::*;
        match self {
            Tram => 0,
            Subway => 1,
            Rail => 2,
            Bus => 3,
            Ferry => 4,
            CableTram => 5,
            AerialLift => 6,
            Furnicular => 7,
            Trolleybus => 11,
            Monorail => 12,
            Other(x) => x,
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteType::Other(x) => write!(f, "{x}"),
            x => write!(f, "{:?}", x),
        }
    }
}

impl Route {
    /// Long name, then short name, then the ID
    pub fn display_name(&self) -> String {
        self.long_name
            .as_ref()
            .or(self.short_name.as_ref())
            .map(|x| x.to_string())
            .unwrap_or_else(|| self.route_id.to_string())
    }

    /// "short - long" when both exist. This is what trip filters match against.
    pub fn label(&self) -> String {
        match (&self.short_name, &self.long_name) {
            (Some(short), Some(long)) => format!("{short} - {long}"),
            (Some(x), None) | (None, Some(x)) => x.to_string(),
            (None, None) => self.route_id.to_string(),
        }
    }
}

pub fn load<R: Read>(reader: R) -> Result<BTreeMap<RouteID, Route>> {
    let mut routes = BTreeMap::new();
    for rec in read_rows::<_, Record>("routes.txt", reader, &["route_id", "route_type"])? {
        let route_id = match rec.route_id {
            Some(id) => id,
            None => continue,
        };
        if routes.contains_key(&route_id) {
            warn!("routes.txt: duplicate {route_id}, keeping the first");
            continue;
        }
        routes.insert(
            route_id.clone(),
            Route {
                route_id,
                route_type: rec.route_type.map(RouteType::from_code),
                short_name: rec.route_short_name,
                long_name: rec.route_long_name,
            },
        );
    }
    Ok(routes)
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    route_id: Option<RouteID>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    route_type: Option<u16>,
    #[serde(default)]
    route_short_name: Option<String>,
    #[serde(default)]
    route_long_name: Option<String>,
}
