//! Requested leave.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A staff member's request not to work on a date, or on one shift of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    /// Requesting staff member.
    pub staff_id: String,
    /// Requested date.
    pub date: NaiveDate,
    /// Specific shift name; `None` blocks the whole day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
}

impl LeaveRequest {
    /// Whole-day leave.
    pub fn full_day(staff_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            staff_id: staff_id.into(),
            date,
            shift: None,
        }
    }

    /// Leave from a single shift.
    pub fn for_shift(staff_id: impl Into<String>, date: NaiveDate, shift: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            date,
            shift: Some(shift.into()),
        }
    }

    /// Whether the request covers the whole day.
    pub fn is_full_day(&self) -> bool {
        self.shift.is_none()
    }
}
