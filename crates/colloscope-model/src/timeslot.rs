#![forbid(unsafe_code)]

//! Weekly timeslots and the lunch range.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One hour-long slot in the weekly grid. `day` counts from Monday (0).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timeslot {
    pub day: u8,
    pub hour: u8,
}

impl Timeslot {
    #[must_use]
    pub const fn new(day: u8, hour: u8) -> Self {
        Self { day, hour }
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
        let day = DAYS.get(usize::from(self.day)).copied().unwrap_or("?");
        write!(f, "{day} {}h", self.hour)
    }
}

/// Daily hour span reserved for lunch; colles are kept outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunchRange {
    /// First lunch hour (inclusive).
    pub start: u8,
    /// First hour after lunch (exclusive).
    pub end: u8,
}

impl LunchRange {
    #[must_use]
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// True when `hour` falls inside the range.
    #[must_use]
    pub fn contains(&self, hour: u8) -> bool {
        self.start <= hour && hour < self.end
    }
}

impl Default for LunchRange {
    fn default() -> Self {
        Self { start: 12, end: 14 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeslot_display() {
        assert_eq!(Timeslot::new(0, 8).to_string(), "mon 8h");
        assert_eq!(Timeslot::new(4, 17).to_string(), "fri 17h");
    }

    #[test]
    fn lunch_range_contains() {
        let lunch = LunchRange::default();
        assert!(lunch.contains(12));
        assert!(lunch.contains(13));
        assert!(!lunch.contains(14));
        assert!(!lunch.contains(8));
    }
}
