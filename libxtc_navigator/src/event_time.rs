use serde::{Deserialize, Serialize};
use std::fmt::Display;
use time::macros::format_description;
use time::OffsetDateTime;

/// EventTime is the ordered identifier of a recorded event.
///
/// Ordering is lexicographic over (seconds, nanoseconds, fiducial), which is the
/// order in which the DAQ records events within a run. EventTimes are produced by
/// the record store and never modified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EventTime {
    pub seconds: u32,
    pub nanoseconds: u32,
    pub fiducial: u32,
}

impl EventTime {
    pub fn new(seconds: u32, nanoseconds: u32, fiducial: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
            fiducial,
        }
    }

    /// Seconds since the epoch as a float
    pub fn as_f64(&self) -> f64 {
        self.seconds as f64 + self.nanoseconds as f64 / 1.0e9
    }

    /// The (seconds, nanoseconds, fiducial) form used by jump requests
    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.seconds, self.nanoseconds, self.fiducial)
    }

    /// Seconds in the high word, nanoseconds in the low word
    pub fn packed_time(&self) -> u64 {
        ((self.seconds as u64) << 32) | self.nanoseconds as u64
    }

    pub fn to_datetime(&self) -> Option<OffsetDateTime> {
        let nanos = self.seconds as i128 * 1_000_000_000 + self.nanoseconds as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

impl From<(u32, u32, u32)> for EventTime {
    fn from(value: (u32, u32, u32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl Display for EventTime {
    /// UTC wall clock time with a tenth of a millisecond resolution
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let format = format_description!("[hour]:[minute]:[second]");
        match self.to_datetime().and_then(|dt| dt.format(&format).ok()) {
            Some(clock) => write!(f, "{}.{:04}", clock, self.nanoseconds / 100_000),
            None => write!(f, "NA"),
        }
    }
}
