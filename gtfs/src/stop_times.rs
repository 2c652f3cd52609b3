use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::table::read_rows;
use crate::{StopID, Time, TripID};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopTime {
    pub stop_id: StopID,
    pub arrival_time: Option<Time>,
    pub departure_time: Option<Time>,
    pub stop_sequence: u32,
}

impl StopTime {
    /// When the vehicle leaves this stop, falling back to when it arrives
    pub fn time(&self) -> Option<Time> {
        self.departure_time.or(self.arrival_time)
    }
}

/// The earliest departure among stop_times numbered 1. Feeds that don't start numbering at 1 use
/// the earliest departure overall.
pub fn start_time(stop_times: &[StopTime]) -> Option<Time> {
    let first = stop_times
        .iter()
        .filter(|st| st.stop_sequence == 1)
        .filter_map(|st| st.time())
        .min();
    first.or_else(|| stop_times.iter().filter_map(|st| st.time()).min())
}

/// Returns stop_times grouped by trip and sorted by stop_sequence
pub fn load<R: Read>(reader: R) -> Result<BTreeMap<TripID, Vec<StopTime>>> {
    let rows = read_rows::<_, Record>(
        "stop_times.txt",
        reader,
        &[
            "trip_id",
            "arrival_time",
            "departure_time",
            "stop_id",
            "stop_sequence",
        ],
    )?;

    let mut stop_times: BTreeMap<TripID, Vec<StopTime>> = BTreeMap::new();
    for rec in rows {
        let (trip_id, stop_id) = match (rec.trip_id, rec.stop_id) {
            (Some(t), Some(s)) => (t, s),
            _ => continue,
        };
        let arrival_time = rec.arrival_time.as_deref().and_then(Time::parse);
        let departure_time = rec.departure_time.as_deref().and_then(Time::parse);
        stop_times.entry(trip_id).or_default().push(StopTime {
            stop_id,
            arrival_time: arrival_time.or(departure_time),
            departure_time: departure_time.or(arrival_time),
            stop_sequence: rec.stop_sequence.unwrap_or(0),
        });
    }

    // Sort by stop_sequence, in case the file isn't in order. The sort is stable, so rows with
    // the same (or a garbled) sequence keep file order.
    for (trip_id, list) in &mut stop_times {
        list.sort_by_key(|st| st.stop_sequence);
        if list
            .windows(2)
            .any(|pair| matches!((pair[0].time(), pair[1].time()), (Some(t1), Some(t2)) if t1 > t2))
        {
            debug!("stop_times.txt: times for {trip_id} go backwards");
        }
    }
    Ok(stop_times)
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    trip_id: Option<TripID>,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    #[serde(default)]
    stop_id: Option<StopID>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_sequence: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_defaulted() {
        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,08:10:00,,b,2
t1,,08:00:00,a,1
t1,25:00:00,25:01:00,c,3
";
        let all = load(input.as_bytes()).unwrap();
        let list = &all[&TripID::new("t1")];
        let stops: Vec<&str> = list.iter().map(|st| st.stop_id.as_str()).collect();
        assert_eq!(stops, vec!["a", "b", "c"]);
        assert_eq!(list[0].arrival_time, Some(Time::hms(8, 0, 0)));
        assert_eq!(list[1].departure_time, Some(Time::hms(8, 10, 0)));
        assert_eq!(list[2].time(), Some(Time::hms(25, 1, 0)));
        assert_eq!(start_time(list), Some(Time::hms(8, 0, 0)));
    }

    #[test]
    fn start_time_without_sequence_one() {
        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,09:05:00,09:06:00,b,20
t1,09:00:00,09:01:00,a,10
";
        let all = load(input.as_bytes()).unwrap();
        assert_eq!(
            start_time(&all[&TripID::new("t1")]),
            Some(Time::hms(9, 1, 0))
        );
    }

    #[test]
    fn unparseable_times_are_unavailable() {
        let input = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,soon,,a,1
";
        let all = load(input.as_bytes()).unwrap();
        let st = &all[&TripID::new("t1")][0];
        assert_eq!(st.time(), None);
        assert_eq!(start_time(&all[&TripID::new("t1")]), None);
    }
}
