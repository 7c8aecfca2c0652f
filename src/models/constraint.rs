//! Constraint kinds, limits and the relaxation priority order.
//!
//! The exact solver holds every assignment to leave, streak and hours limits
//! but does not search for balance, so a roster it certifies can still
//! exceed a spread limit; the audit reports those. When it cannot certify a
//! roster, the relaxation pass enforces every kind one at a time in
//! [`PriorityOrder`], and a later kind gives way wherever its repair would
//! break an earlier one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A kind of roster constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    /// Requested leave is honoured.
    #[serde(alias = "leave_dates")]
    UserOffDays,
    /// Consecutive working days stay within `max_consecutive_shifts`.
    #[serde(alias = "consecutive_shifts")]
    MaxConsecutiveShifts,
    /// Consecutive night shifts stay within `max_night_shifts`.
    #[serde(alias = "consecutive_night_shifts")]
    MaxNightShifts,
    /// Contiguous on-duty hours stay within `max_consecutive_working_hours`.
    MaxConsecutiveWorkingHours,
    /// Spread of total shift counts across staff stays within `max_shift_diff`.
    MaxShiftDiff,
    /// Spread of per-shift counts stays within `max_shift_diff_per_type`.
    MaxShiftDiffPerType,
}

impl ConstraintKind {
    /// Every kind, in default priority order.
    pub const ALL: [ConstraintKind; 6] = [
        ConstraintKind::UserOffDays,
        ConstraintKind::MaxConsecutiveShifts,
        ConstraintKind::MaxNightShifts,
        ConstraintKind::MaxConsecutiveWorkingHours,
        ConstraintKind::MaxShiftDiff,
        ConstraintKind::MaxShiftDiffPerType,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKind::UserOffDays => "userOffDays",
            ConstraintKind::MaxConsecutiveShifts => "maxConsecutiveShifts",
            ConstraintKind::MaxNightShifts => "maxNightShifts",
            ConstraintKind::MaxConsecutiveWorkingHours => "maxConsecutiveWorkingHours",
            ConstraintKind::MaxShiftDiff => "maxShiftDiff",
            ConstraintKind::MaxShiftDiffPerType => "maxShiftDiffPerType",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated numeric limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintLimits {
    /// Longest allowed run of consecutive working days.
    pub max_consecutive_shifts: u32,
    /// Longest allowed run of consecutive night shifts.
    pub max_night_shifts: u32,
    /// Longest allowed contiguous on-duty span, in hours.
    pub max_consecutive_working_hours: u32,
    /// Allowed spread between the most and least assigned staff.
    pub max_shift_diff: u32,
    /// Allowed spread per shift name.
    pub max_shift_diff_per_type: u32,
}

impl ConstraintLimits {
    /// Limit value for a kind; `None` for kinds without a numeric limit.
    pub fn limit_for(&self, kind: ConstraintKind) -> Option<u32> {
        match kind {
            ConstraintKind::UserOffDays => None,
            ConstraintKind::MaxConsecutiveShifts => Some(self.max_consecutive_shifts),
            ConstraintKind::MaxNightShifts => Some(self.max_night_shifts),
            ConstraintKind::MaxConsecutiveWorkingHours => Some(self.max_consecutive_working_hours),
            ConstraintKind::MaxShiftDiff => Some(self.max_shift_diff),
            ConstraintKind::MaxShiftDiffPerType => Some(self.max_shift_diff_per_type),
        }
    }
}

impl Default for ConstraintLimits {
    fn default() -> Self {
        Self {
            max_consecutive_shifts: 3,
            max_night_shifts: 2,
            max_consecutive_working_hours: 16,
            max_shift_diff: 3,
            max_shift_diff_per_type: 2,
        }
    }
}

/// Ordered, duplicate-free, complete sequence of constraint kinds.
///
/// Only built through [`PriorityOrder::normalize`] or `Default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityOrder(Vec<ConstraintKind>);

impl PriorityOrder {
    /// Normalizes a caller-supplied order.
    ///
    /// Duplicates are dropped keeping the first occurrence, then every kind
    /// not mentioned is appended in default order.
    pub fn normalize(requested: &[ConstraintKind]) -> Self {
        let mut order = Vec::with_capacity(ConstraintKind::ALL.len());
        for &kind in requested.iter().chain(ConstraintKind::ALL.iter()) {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        Self(order)
    }

    /// Kinds in enforcement order.
    pub fn kinds(&self) -> &[ConstraintKind] {
        &self.0
    }
}

impl Default for PriorityOrder {
    fn default() -> Self {
        Self(ConstraintKind::ALL.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConstraintKind::*;

    #[test]
    fn test_default_order() {
        assert_eq!(PriorityOrder::default().kinds(), &ConstraintKind::ALL);
        assert_eq!(PriorityOrder::normalize(&[]), PriorityOrder::default());
    }

    #[test]
    fn test_normalize_dedupes_and_completes() {
        let order = PriorityOrder::normalize(&[MaxNightShifts, UserOffDays, MaxNightShifts]);
        assert_eq!(
            order.kinds(),
            &[
                MaxNightShifts,
                UserOffDays,
                MaxConsecutiveShifts,
                MaxConsecutiveWorkingHours,
                MaxShiftDiff,
                MaxShiftDiffPerType,
            ]
        );
    }

    #[test]
    fn test_kind_wire_names_and_aliases() {
        let kinds: Vec<ConstraintKind> = serde_json::from_str(
            r#"["maxShiftDiffPerType","leave_dates","consecutive_shifts","consecutive_night_shifts"]"#,
        )
        .unwrap();
        assert_eq!(
            kinds,
            vec![MaxShiftDiffPerType, UserOffDays, MaxConsecutiveShifts, MaxNightShifts]
        );
        assert_eq!(
            serde_json::to_string(&MaxConsecutiveWorkingHours).unwrap(),
            "\"maxConsecutiveWorkingHours\""
        );
        assert_eq!(MaxShiftDiff.to_string(), "maxShiftDiff");
    }

    #[test]
    fn test_limit_for() {
        let limits = ConstraintLimits::default();
        assert_eq!(limits.limit_for(UserOffDays), None);
        assert_eq!(limits.limit_for(MaxConsecutiveShifts), Some(3));
        assert_eq!(limits.limit_for(MaxNightShifts), Some(2));
        assert_eq!(limits.limit_for(MaxConsecutiveWorkingHours), Some(16));
    }
}
