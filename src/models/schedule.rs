//! Schedule (solution) model.
//!
//! A schedule maps every date of the month to every configured shift name
//! and the staff ids working it. Every date and every shift name always has
//! an entry, even when nobody is assigned. A schedule may carry the
//! constraint violations detected in it, so a relaxed result can be
//! presented with its shortcomings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ConstraintKind;

/// A roster for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Shift names in definition order.
    pub shift_names: Vec<String>,
    /// Date → shift name → assigned staff ids.
    pub days: BTreeMap<NaiveDate, BTreeMap<String, Vec<String>>>,
    /// Constraint violations detected in this schedule.
    #[serde(default)]
    pub violations: Vec<Violation>,
}

/// One staff member working one shift on one date.
///
/// The flat form external storage and exports consume.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Assigned staff member.
    pub staff_id: String,
    /// Worked date.
    pub date: NaiveDate,
    /// Worked shift name.
    pub shift: String,
}

/// A constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity: a staff id, or a shift name for staffing violations.
    pub entity_id: String,
    /// Date the violation is anchored on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of roster violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationType {
    /// A cell holds fewer staff than required.
    Understaffed,
    /// A cell holds more staff than required.
    Overstaffed,
    /// A staff member works two shifts on one date.
    DoubleBooked,
    /// A staff member works during requested leave.
    LeaveConflict,
    /// Working-day streak exceeds its limit.
    ConsecutiveShifts,
    /// Night streak exceeds its limit.
    ConsecutiveNightShifts,
    /// Contiguous on-duty span exceeds its limit.
    ConsecutiveWorkingHours,
    /// Total shift counts spread too far across staff.
    ShiftSpread,
    /// Per-shift counts spread too far across staff.
    ShiftTypeSpread,
}

impl ViolationType {
    /// Default severity.
    pub fn severity(self) -> i32 {
        match self {
            ViolationType::DoubleBooked => 100,
            ViolationType::LeaveConflict => 95,
            ViolationType::Understaffed | ViolationType::Overstaffed => 90,
            ViolationType::ConsecutiveWorkingHours => 80,
            ViolationType::ConsecutiveNightShifts => 75,
            ViolationType::ConsecutiveShifts => 70,
            ViolationType::ShiftSpread => 40,
            ViolationType::ShiftTypeSpread => 30,
        }
    }

    /// The constraint kind this violation breaks, for rule-level violations.
    pub fn constraint_kind(self) -> Option<ConstraintKind> {
        match self {
            ViolationType::LeaveConflict => Some(ConstraintKind::UserOffDays),
            ViolationType::ConsecutiveShifts => Some(ConstraintKind::MaxConsecutiveShifts),
            ViolationType::ConsecutiveNightShifts => Some(ConstraintKind::MaxNightShifts),
            ViolationType::ConsecutiveWorkingHours => {
                Some(ConstraintKind::MaxConsecutiveWorkingHours)
            }
            ViolationType::ShiftSpread => Some(ConstraintKind::MaxShiftDiff),
            ViolationType::ShiftTypeSpread => Some(ConstraintKind::MaxShiftDiffPerType),
            ViolationType::Understaffed
            | ViolationType::Overstaffed
            | ViolationType::DoubleBooked => None,
        }
    }
}

impl Assignment {
    /// Creates an assignment.
    pub fn new(staff_id: impl Into<String>, date: NaiveDate, shift: impl Into<String>) -> Self {
        Self {
            staff_id: staff_id.into(),
            date,
            shift: shift.into(),
        }
    }
}

impl Violation {
    /// Creates a violation with the type's default severity.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        date: Option<NaiveDate>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            date,
            message: message.into(),
            severity: violation_type.severity(),
        }
    }
}

impl Schedule {
    /// Creates a schedule with an empty cell for every date and shift.
    pub fn empty(dates: &[NaiveDate], shift_names: &[String]) -> Self {
        let cells: BTreeMap<String, Vec<String>> = shift_names
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        Self {
            shift_names: shift_names.to_vec(),
            days: dates.iter().map(|d| (*d, cells.clone())).collect(),
            violations: Vec::new(),
        }
    }

    /// Rebuilds a schedule from its flat form.
    ///
    /// Assignments naming an unknown date or shift are ignored; the rest are
    /// added in input order.
    pub fn from_assignments(
        dates: &[NaiveDate],
        shift_names: &[String],
        assignments: &[Assignment],
    ) -> Self {
        let mut schedule = Self::empty(dates, shift_names);
        for a in assignments {
            schedule.assign(a.date, &a.shift, &a.staff_id);
        }
        schedule
    }

    /// Adds a staff id to a cell.
    ///
    /// Returns `false` if the cell does not exist or already lists the id.
    pub fn assign(&mut self, date: NaiveDate, shift: &str, staff_id: &str) -> bool {
        match self.days.get_mut(&date).and_then(|d| d.get_mut(shift)) {
            Some(ids) if !ids.iter().any(|id| id == staff_id) => {
                ids.push(staff_id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Removes a staff id from a cell. Returns whether it was present.
    pub fn remove(&mut self, date: NaiveDate, shift: &str, staff_id: &str) -> bool {
        match self.days.get_mut(&date).and_then(|d| d.get_mut(shift)) {
            Some(ids) => {
                let before = ids.len();
                ids.retain(|id| id != staff_id);
                ids.len() != before
            }
            None => false,
        }
    }

    /// Staff ids assigned to a cell (empty for unknown cells).
    pub fn staff_on(&self, date: NaiveDate, shift: &str) -> &[String] {
        self.days
            .get(&date)
            .and_then(|d| d.get(shift))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shift names a staff member works on a date.
    pub fn shifts_for(&self, staff_id: &str, date: NaiveDate) -> Vec<&str> {
        self.days
            .get(&date)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|(_, ids)| ids.iter().any(|id| id == staff_id))
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flat `(staff, date, shift)` list, ordered by date, then shift
    /// definition order, then position within the cell.
    pub fn to_assignments(&self) -> Vec<Assignment> {
        let mut out = Vec::with_capacity(self.assignment_count());
        for (date, cells) in &self.days {
            for name in &self.shift_names {
                if let Some(ids) = cells.get(name) {
                    out.extend(ids.iter().map(|id| Assignment::new(id.clone(), *date, name.clone())));
                }
            }
        }
        out
    }

    /// All assignments of one staff member, by date.
    pub fn assignments_for_staff(&self, staff_id: &str) -> Vec<Assignment> {
        self.to_assignments()
            .into_iter()
            .filter(|a| a.staff_id == staff_id)
            .collect()
    }

    /// Dates covered, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    /// Adds a violation.
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the schedule has no recorded violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Recorded violations of one type.
    pub fn violations_of(&self, violation_type: ViolationType) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .collect()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.days
            .values()
            .flat_map(|cells| cells.values())
            .map(Vec::len)
            .sum()
    }
}
