use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Seconds since midnight of the service day. GTFS allows times past 24:00:00 for trips running
/// after midnight, so this is never wrapped.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Time(f64);

impl Time {
    pub fn hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + f64::from(seconds))
    }

    /// Parses `HH:MM:SS`. Hours may exceed 23. Anything else is None.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split(':');
        let (h, m, s) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(m), Some(s), None) => (h, m, s),
            _ => return None,
        };
        let h: u32 = h.trim().parse().ok()?;
        let m: u32 = m.trim().parse().ok()?;
        let s: u32 = s.trim().parse().ok()?;
        Some(Self::hms(h, m, s))
    }

    pub fn inner_seconds(self) -> f64 {
        self.0
    }

    /// The hour of the service day this time falls in; 25 for 01:30 the next morning.
    pub fn hour(self) -> usize {
        (self.0 / 3600.0).floor().max(0.0) as usize
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let secs = self.0.max(0.0).floor() as u64;
        write!(
            f,
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Adds a number of seconds
impl Add<f64> for Time {
    type Output = Time;

    fn add(self, secs: f64) -> Time {
        Time(self.0 + secs)
    }
}

impl AddAssign<f64> for Time {
    fn add_assign(&mut self, secs: f64) {
        self.0 += secs;
    }
}

/// The difference in seconds
impl Sub for Time {
    type Output = f64;

    fn sub(self, other: Time) -> f64 {
        self.0 - other.0
    }
}
