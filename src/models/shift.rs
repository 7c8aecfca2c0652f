//! Shift definitions.
//!
//! The set of shifts is configuration: a ward may run one shift a day or
//! five, named however it likes. Everything downstream addresses shifts by
//! their index in definition order.
//!
//! # Time model
//! Start and end are times of day. A shift whose end is not after its start
//! runs past midnight into the next calendar day; equal start and end means
//! a 24-hour shift. Absolute times are minutes from the start of the month
//! (`day * 1440 + minute_of_day`).

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::Role;

/// Minutes in a day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Headcount required per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRequirement {
    /// Nurses required.
    pub nurse: u32,
    /// Assistants required.
    pub assistant: u32,
}

impl StaffRequirement {
    /// Creates a requirement.
    pub fn new(nurse: u32, assistant: u32) -> Self {
        Self { nurse, assistant }
    }

    /// Requirement for one role.
    #[inline]
    pub fn for_role(&self, role: Role) -> u32 {
        match role {
            Role::Nurse => self.nurse,
            Role::Assistant => self.assistant,
        }
    }

    /// Total headcount.
    #[inline]
    pub fn total(&self) -> u64 {
        u64::from(self.nurse) + u64::from(self.assistant)
    }
}

/// A named, time-bounded shift with its default staffing requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDefinition {
    /// Shift name, unique within the ward's configuration.
    pub name: String,
    /// Start time of day.
    pub start: NaiveTime,
    /// End time of day.
    pub end: NaiveTime,
    /// Default staffing requirement.
    pub required_staff: StaffRequirement,
    /// Whether this shift counts toward night streaks.
    pub night: bool,
}

impl ShiftDefinition {
    /// Creates a day shift.
    pub fn new(
        name: impl Into<String>,
        start: NaiveTime,
        end: NaiveTime,
        required_staff: StaffRequirement,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            required_staff,
            night: false,
        }
    }

    /// Marks this shift as a night shift.
    pub fn with_night(mut self, night: bool) -> Self {
        self.night = night;
        self
    }

    /// Start as minutes after midnight.
    #[inline]
    pub fn start_minute(&self) -> i64 {
        minute_of_day(self.start)
    }

    /// Whether the shift ends on the following calendar day.
    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Length in minutes (1..=1440).
    pub fn duration_minutes(&self) -> i64 {
        let diff = minute_of_day(self.end) - self.start_minute();
        if diff <= 0 {
            diff + MINUTES_PER_DAY
        } else {
            diff
        }
    }

    /// Absolute start when worked on `day`.
    #[inline]
    pub fn absolute_start(&self, day: usize) -> i64 {
        day as i64 * MINUTES_PER_DAY + self.start_minute()
    }

    /// Absolute end when worked on `day`.
    #[inline]
    pub fn absolute_end(&self, day: usize) -> i64 {
        self.absolute_start(day) + self.duration_minutes()
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

fn minute_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_day_shift_duration() {
        let s = ShiftDefinition::new("morning", t(7, 0), t(15, 0), StaffRequirement::new(2, 1));
        assert_eq!(s.duration_minutes(), 480);
        assert!(!s.crosses_midnight());
        assert_eq!(s.absolute_start(1), 1440 + 420);
        assert_eq!(s.absolute_end(1), 1440 + 900);
    }

    #[test]
    fn test_overnight_shift() {
        let s = ShiftDefinition::new("night", t(23, 0), t(7, 0), StaffRequirement::new(1, 0));
        assert!(s.crosses_midnight());
        assert_eq!(s.duration_minutes(), 480);
        assert_eq!(s.absolute_end(0), 1860);
    }

    #[test]
    fn test_full_day_shift() {
        let s = ShiftDefinition::new("24h", t(8, 0), t(8, 0), StaffRequirement::default());
        assert_eq!(s.duration_minutes(), MINUTES_PER_DAY);
    }

    #[test]
    fn test_requirement() {
        let r = StaffRequirement::new(3, 2);
        assert_eq!(r.total(), 5);
        assert_eq!(r.for_role(Role::Nurse), 3);
        assert_eq!(r.for_role(Role::Assistant), 2);
        assert_eq!(
            StaffRequirement::new(u32::MAX, u32::MAX).total(),
            2 * u64::from(u32::MAX)
        );
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("07:00"), Some(t(7, 0)));
        assert_eq!(parse_time_of_day(" 23:30 "), Some(t(23, 30)));
        assert_eq!(parse_time_of_day("15:00:00"), Some(t(15, 0)));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day(""), None);
    }
}
