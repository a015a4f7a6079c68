use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// A fixed date and hour at which daylight is simulated.
///
/// Only the six points of [`SimulationTimepoint::ALL`] exist. They order by their
/// position in that table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulationTimepoint {
    index: usize,
    month: u32,
    day: u32,
    hour: u32,
    label: &'static str,
}

impl SimulationTimepoint {
    /// Equinox first, then summer solstice; 10:00, 12:00 and 14:00 each.
    pub const ALL: [SimulationTimepoint; 6] = [
        SimulationTimepoint::equinox(0, 10),
        SimulationTimepoint::equinox(1, 12),
        SimulationTimepoint::equinox(2, 14),
        SimulationTimepoint::summer_solstice(3, 10),
        SimulationTimepoint::summer_solstice(4, 12),
        SimulationTimepoint::summer_solstice(5, 14),
    ];

    const fn equinox(index: usize, hour: u32) -> Self {
        SimulationTimepoint {
            index,
            month: 9,
            day: 21,
            hour,
            label: "Equinox",
        }
    }

    const fn summer_solstice(index: usize, hour: u32) -> Self {
        SimulationTimepoint {
            index,
            month: 6,
            day: 21,
            hour,
            label: "Summer Solstice",
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Key the result retrieval uses for this point in time, e.g. `9_21_10`.
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.month, self.day, self.hour)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|timepoint| timepoint.key() == key)
    }

    /// Human readable form, e.g. `Equinox @ 10:00`.
    pub fn description(&self) -> String {
        format!("{} @ {}:00", self.label, self.hour)
    }

    /// Local date and time of this point in the given year.
    pub fn local_datetime(&self, year: i32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)?.and_hms_opt(self.hour, 0, 0)
    }
}

impl fmt::Display for SimulationTimepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.month, self.day, self.hour)
    }
}

impl Serialize for SimulationTimepoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
