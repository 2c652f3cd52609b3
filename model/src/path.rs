use gtfs::{LonLat, Time, Trip, GTFS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedPathPoint {
    pub pos: LonLat,
    pub time: Time,
}

/// A trip's shape, with a time assigned to every point. Empty means the trip can't be animated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TripPath {
    inner: Vec<TimedPathPoint>,
}

impl TripPath {
    /// Fuses the trip's stop times with its shape. Stop times whose stop is unknown, has no
    /// position, or has no time can't anchor anything and are skipped.
    pub fn for_trip(gtfs: &GTFS, trip: &Trip) -> Self {
        let shape = match gtfs.shape_for(trip) {
            Some(shape) if shape.is_interpolable() => shape,
            _ => return Self::default(),
        };

        let mut anchors = Vec::new();
        for st in gtfs.stop_times_for(&trip.trip_id) {
            let pos = match gtfs.stops.get(&st.stop_id) {
                Some(stop) if stop.pos.is_valid() => stop.pos,
                _ => {
                    debug!("{}: no position for stop {}", trip.trip_id, st.stop_id);
                    continue;
                }
            };
            if let Some(time) = st.time() {
                anchors.push(TimedPathPoint { pos, time });
            }
        }

        let pts: Vec<LonLat> = shape.points.iter().map(|pt| pt.pos).collect();
        Self::interpolate(&anchors, &pts)
    }

    /// Walks the shape with a cursor over consecutive pairs of anchors (stops with known times).
    /// A shape point farther from the current anchor than the next anchor moves the cursor
    /// forward by one pair. The cursor only moves one pair per shape point, so a sparse shape
    /// around closely spaced stops lags a bit. Shape points past the final anchor are dropped.
    pub fn interpolate(anchors: &[TimedPathPoint], shape: &[LonLat]) -> Self {
        let mut inner = Vec::new();
        if anchors.len() < 2 || shape.len() < 2 {
            return Self { inner };
        }

        let last_pair = anchors.len() - 1;
        let mut idx = 0;
        // The pair and time of the previous point
        let mut prev: Option<(usize, Time)> = None;
        for pt in shape.iter().copied().filter(|pt| pt.is_valid()) {
            if idx >= last_pair {
                break;
            }
            let (mut curr, mut next) = (anchors[idx], anchors[idx + 1]);
            let mut dist_total = curr.pos.gps_dist(next.pos);
            let mut dist_cur = curr.pos.gps_dist(pt);
            // Past the next stop: measure against the following pair instead of extrapolating
            if dist_cur > dist_total {
                idx += 1;
                if idx >= last_pair {
                    break;
                }
                curr = anchors[idx];
                next = anchors[idx + 1];
                dist_total = curr.pos.gps_dist(next.pos);
                dist_cur = curr.pos.gps_dist(pt);
            }
            // Co-located anchors put the point at the first one
            let progress = if dist_total > 0.0 {
                (dist_cur / dist_total).min(1.0)
            } else {
                0.0
            };
            let mut time = curr.time + (next.time - curr.time) * progress;
            // A curving shape can briefly get closer to the current stop again. Don't let that
            // move time backwards, unless the stop times themselves do.
            if let Some((prev_idx, prev_time)) = prev {
                if prev_idx == idx && next.time >= curr.time {
                    time = time.max(prev_time);
                }
            }
            prev = Some((idx, time));
            inner.push(TimedPathPoint { pos: pt, time });
        }
        Self { inner }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn points(&self) -> &[TimedPathPoint] {
        &self.inner
    }

    pub fn first(&self) -> Option<TimedPathPoint> {
        self.inner.first().copied()
    }

    pub fn last(&self) -> Option<TimedPathPoint> {
        self.inner.last().copied()
    }

    pub fn end_time(&self) -> Option<Time> {
        self.last().map(|pt| pt.time)
    }

    /// Where the vehicle is at some time. Before the path starts, it waits at the first point.
    /// None after the path ends.
    pub fn position_at(&self, time: Time) -> Option<LonLat> {
        // Number of points strictly before this time. Path times are non-decreasing, so the
        // point before that index and the one at it bracket the time.
        let idx = self.inner.partition_point(|pt| pt.time < time);
        if idx == 0 {
            return self.first().map(|pt| pt.pos);
        }
        if idx == self.inner.len() {
            return None;
        }
        let (a, b) = (self.inner[idx - 1], self.inner[idx]);
        let pct = (time - a.time) / (b.time - a.time);
        Some(a.pos.lerp(b.pos, pct))
    }
}
