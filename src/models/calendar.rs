//! Calendar month expansion.
//!
//! A roster always covers one calendar month. The month is expanded into
//! its ordered dates once per run; every other component addresses days by
//! their zero-based index into that list.
//!
//! # Date keys
//! Dates are keyed as ISO `YYYY-MM-DD`, the form the surrounding services
//! store and display.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Earliest accepted year.
pub const MIN_YEAR: i32 = 1;
/// Latest accepted year (keeps date keys at four digits).
pub const MAX_YEAR: i32 = 9999;

/// The ordered dates of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCalendar {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Dates `1..=days_in_month`, ascending.
    pub dates: Vec<NaiveDate>,
}

impl MonthCalendar {
    /// Expands `(year, month)` into its dates.
    ///
    /// # Errors
    /// `InvalidCalendarInput` if `month` is outside 1-12 or `year` is
    /// outside [`MIN_YEAR`]..=[`MAX_YEAR`].
    pub fn new(year: i32, month: u32) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidCalendarInput { year, month };

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(invalid());
        }

        let days = days_in_month(year, month).ok_or_else(invalid)?;
        let dates = (1..=days)
            .map(|day| NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { year, month, dates })
    }

    /// Number of days in the month.
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always false for a constructed calendar; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Whether `date` falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Zero-based day index of `date`, if it is in this month.
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        if self.contains(date) {
            Some(date.day0() as usize)
        } else {
            None
        }
    }

    /// Date at a zero-based day index.
    pub fn date(&self, day: usize) -> Option<NaiveDate> {
        self.dates.get(day).copied()
    }

    /// ISO `YYYY-MM-DD` keys for every date, ascending.
    pub fn date_keys(&self) -> Vec<String> {
        self.dates.iter().map(|d| date_key(*d)).collect()
    }
}

/// Formats a date as an ISO `YYYY-MM-DD` key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Days in a month, accounting for leap years.
///
/// Returns `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}
