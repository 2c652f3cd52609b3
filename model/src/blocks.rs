use std::collections::BTreeMap;

use gtfs::{BlockID, LonLat, Time, TripID, GTFS};

use crate::{ChainingThresholds, TimedPathPoint};

/// For every trip in a run, the trip served next by the same vehicle.
#[derive(Clone, Debug, Default)]
pub struct BlockChains {
    blocks: BTreeMap<BlockID, Vec<TripID>>,
    next_trip: BTreeMap<TripID, TripID>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChainDecision {
    Continue {
        next: TripID,
        start_pos: LonLat,
        deadhead_meters: f64,
        layover_seconds: f64,
    },
    EndOfBlock,
    /// The next trip already started, isn't part of this run, or starts before this one ends
    Unavailable(TripID),
    NoStartPosition(TripID),
    Implausible {
        next: TripID,
        deadhead_meters: f64,
        layover_seconds: f64,
    },
}

impl BlockChains {
    /// Only these trips are chained; a block's trips outside the run are skipped over. Trips
    /// without a start time can't be ordered and are left out.
    pub fn build(gtfs: &GTFS, trips: &[TripID]) -> Self {
        let mut blocks: BTreeMap<BlockID, Vec<(Time, TripID)>> = BTreeMap::new();
        for id in trips {
            let block = match gtfs.trips.get(id).and_then(|t| t.block_id.clone()) {
                Some(block) => block,
                None => continue,
            };
            if let Some(start) = gtfs.start_time(id) {
                blocks.entry(block).or_default().push((start, id.clone()));
            }
        }

        let mut chains = Self::default();
        for (block, mut list) in blocks {
            list.sort();
            for pair in list.windows(2) {
                chains
                    .next_trip
                    .insert(pair[0].1.clone(), pair[1].1.clone());
            }
            chains
                .blocks
                .insert(block, list.into_iter().map(|(_, id)| id).collect());
        }
        chains
    }

    pub fn next_trip(&self, trip: &TripID) -> Option<&TripID> {
        self.next_trip.get(trip)
    }

    pub fn blocks(&self) -> &BTreeMap<BlockID, Vec<TripID>> {
        &self.blocks
    }

    /// Decides whether the vehicle finishing `trip` at `end` goes on to serve the next trip in
    /// its block. `is_pending` says whether a trip is still waiting to start.
    pub fn decide<F: Fn(&TripID) -> bool>(
        &self,
        gtfs: &GTFS,
        thresholds: &ChainingThresholds,
        trip: &TripID,
        end: TimedPathPoint,
        is_pending: F,
    ) -> ChainDecision {
        let next = match self.next_trip(trip) {
            Some(next) => next.clone(),
            None => return ChainDecision::EndOfBlock,
        };
        let next_start = match gtfs.start_time(&next) {
            Some(time) if is_pending(&next) && time > end.time => time,
            _ => return ChainDecision::Unavailable(next),
        };
        let start_pos = match gtfs.first_stop(&next) {
            Some(stop) if stop.pos.is_valid() => stop.pos,
            _ => return ChainDecision::NoStartPosition(next),
        };

        let deadhead_meters = end.pos.gps_dist(start_pos);
        let layover_seconds = next_start - end.time;
        if thresholds.is_implausible(deadhead_meters, layover_seconds) {
            return ChainDecision::Implausible {
                next,
                deadhead_meters,
                layover_seconds,
            };
        }
        ChainDecision::Continue {
            next,
            start_pos,
            deadhead_meters,
            layover_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::one_line;

    fn ids(list: &[&str]) -> Vec<TripID> {
        list.iter().map(|id| TripID::new(*id)).collect()
    }

    fn end_at(lon: f64, time: Time) -> TimedPathPoint {
        TimedPathPoint {
            pos: LonLat::new(lon, 0.0),
            time,
        }
    }

    #[test]
    fn ordered_by_start_time_within_the_run() {
        let gtfs = one_line()
            .trip("late", "r1", "s1", Some("b1"), None)
            .trip("early", "r1", "s2", Some("b1"), None)
            .trip("middle", "r1", "s1", Some("b1"), None)
            .trip("loner", "r1", "s1", None, None)
            .stop_times("early", &[("b", "08:00:00"), ("a", "08:10:00")])
            .stop_times("middle", &[("a", "08:20:00"), ("b", "08:30:00")])
            .stop_times("late", &[("b", "08:40:00"), ("a", "08:50:00")])
            .stop_times("loner", &[("a", "08:00:00"), ("b", "08:10:00")])
            .build();

        let chains = BlockChains::build(&gtfs, &ids(&["late", "early", "middle", "loner"]));
        assert_eq!(
            chains.blocks()[&BlockID::new("b1")],
            ids(&["early", "middle", "late"])
        );
        assert_eq!(chains.next_trip(&TripID::new("early")), Some(&TripID::new("middle")));
        assert_eq!(chains.next_trip(&TripID::new("late")), None);
        assert_eq!(chains.next_trip(&TripID::new("loner")), None);

        // Leaving the middle trip out of the run links the other two directly
        let chains = BlockChains::build(&gtfs, &ids(&["late", "early"]));
        assert_eq!(chains.next_trip(&TripID::new("early")), Some(&TripID::new("late")));
    }

    #[test]
    fn decisions() {
        let gtfs = one_line()
            .stop("far", 0.045, 0.0)
            .trip("t1", "r1", "s1", Some("b1"), None)
            .trip("t2", "r1", "s2", Some("b1"), None)
            .trip("t3", "r1", "s1", Some("b2"), None)
            .trip("t4", "r1", "s1", Some("b2"), None)
            .stop_times("t1", &[("a", "08:00:00"), ("b", "08:10:00")])
            .stop_times("t2", &[("b", "08:15:00"), ("a", "08:25:00")])
            .stop_times("t3", &[("a", "09:00:00"), ("b", "09:10:00")])
            .stop_times("t4", &[("far", "09:20:00"), ("b", "09:30:00")])
            .build();
        let chains = BlockChains::build(&gtfs, &ids(&["t1", "t2", "t3", "t4"]));
        let thresholds = ChainingThresholds::default();

        match chains.decide(
            &gtfs,
            &thresholds,
            &TripID::new("t1"),
            end_at(0.009, Time::hms(8, 10, 0)),
            |_| true,
        ) {
            ChainDecision::Continue {
                next,
                layover_seconds,
                ..
            } => {
                assert_eq!(next, TripID::new("t2"));
                assert_eq!(layover_seconds, 300.0);
            }
            x => panic!("expected to continue, got {:?}", x),
        }

        // Already running
        assert_eq!(
            chains.decide(
                &gtfs,
                &thresholds,
                &TripID::new("t1"),
                end_at(0.009, Time::hms(8, 10, 0)),
                |_| false,
            ),
            ChainDecision::Unavailable(TripID::new("t2"))
        );
        // Finished late
        assert_eq!(
            chains.decide(
                &gtfs,
                &thresholds,
                &TripID::new("t1"),
                end_at(0.009, Time::hms(8, 15, 0)),
                |_| true,
            ),
            ChainDecision::Unavailable(TripID::new("t2"))
        );
        assert_eq!(
            chains.decide(
                &gtfs,
                &thresholds,
                &TripID::new("t2"),
                end_at(0.0, Time::hms(8, 25, 0)),
                |_| true,
            ),
            ChainDecision::EndOfBlock
        );
        // About 4km in 10 minutes
        assert!(matches!(
            chains.decide(
                &gtfs,
                &thresholds,
                &TripID::new("t3"),
                end_at(0.009, Time::hms(9, 10, 0)),
                |_| true,
            ),
            ChainDecision::Implausible { .. }
        ));
    }
}
