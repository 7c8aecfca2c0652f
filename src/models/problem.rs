//! Normalized constraint model.
//!
//! The validated, index-addressed form of a [`super::GenerationRequest`].
//! Days, staff and shifts are addressed by zero-based index; per-cell
//! requirements and per-day leave are precomputed so the solver and the
//! repair rules answer every question in constant time.

use serde::Serialize;

use super::{
    ConstraintLimits, LeaveRequest, MonthCalendar, PriorityOrder, Role, ShiftDefinition,
    StaffMember, StaffRequirement,
};

/// Leave a staff member holds on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayLeave {
    /// Entire day blocked.
    pub full_day: bool,
    /// Individually blocked shift indices.
    pub shifts: Vec<usize>,
}

impl DayLeave {
    fn covers(&self, shift: usize) -> bool {
        self.full_day || self.shifts.contains(&shift)
    }
}

/// Validated problem for one ward and month.
///
/// Built only by [`crate::validation::validate_request`]; it serializes for
/// inspection but never deserializes.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintModel {
    /// Ward being rostered.
    pub ward_id: String,
    /// The month's dates.
    pub calendar: MonthCalendar,
    /// Staff in roster order.
    pub staff: Vec<StaffMember>,
    /// Shifts in definition order, with night designation resolved.
    pub shifts: Vec<ShiftDefinition>,
    /// Leave requests as submitted.
    pub leave: Vec<LeaveRequest>,
    /// Numeric limits.
    pub limits: ConstraintLimits,
    /// Complete relaxation order.
    pub priority: PriorityOrder,
    /// Staff indices in the order the solver visits them.
    pub traversal: Vec<usize>,
    /// `[day * n_shifts + shift]`.
    requirements: Vec<StaffRequirement>,
    /// `[day * n_staff + staff]`.
    day_leave: Vec<Option<DayLeave>>,
    /// Per staff: whole-day leave on every day of the month.
    absent_all_month: Vec<bool>,
}

impl ConstraintModel {
    /// Assembles a model from already-validated parts.
    ///
    /// `requirements` is indexed `[day * n_shifts + shift]` and `day_leave`
    /// `[day * n_staff + staff]`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        ward_id: String,
        calendar: MonthCalendar,
        staff: Vec<StaffMember>,
        shifts: Vec<ShiftDefinition>,
        leave: Vec<LeaveRequest>,
        limits: ConstraintLimits,
        priority: PriorityOrder,
        traversal: Vec<usize>,
        requirements: Vec<StaffRequirement>,
        day_leave: Vec<Option<DayLeave>>,
    ) -> Self {
        debug_assert_eq!(requirements.len(), calendar.len() * shifts.len());
        debug_assert_eq!(day_leave.len(), calendar.len() * staff.len());
        debug_assert_eq!(traversal.len(), staff.len());
        let n_staff = staff.len();
        let absent_all_month = (0..n_staff)
            .map(|s| {
                (0..calendar.len()).all(|day| {
                    day_leave[day * n_staff + s]
                        .as_ref()
                        .is_some_and(|l| l.full_day)
                })
            })
            .collect();
        Self {
            ward_id,
            calendar,
            staff,
            shifts,
            leave,
            limits,
            priority,
            traversal,
            requirements,
            day_leave,
            absent_all_month,
        }
    }

    /// Number of days in the month.
    #[inline]
    pub fn n_days(&self) -> usize {
        self.calendar.len()
    }

    /// Number of staff members.
    #[inline]
    pub fn n_staff(&self) -> usize {
        self.staff.len()
    }

    /// Number of shifts per day.
    #[inline]
    pub fn n_shifts(&self) -> usize {
        self.shifts.len()
    }

    /// Role of a staff member.
    #[inline]
    pub fn role(&self, staff: usize) -> Role {
        self.staff[staff].role
    }

    /// Requirement of one cell.
    #[inline]
    pub fn requirement(&self, day: usize, shift: usize) -> StaffRequirement {
        self.requirements[day * self.n_shifts() + shift]
    }

    /// Whether a shift counts toward night streaks.
    #[inline]
    pub fn is_night(&self, shift: usize) -> bool {
        self.shifts[shift].night
    }

    /// Whether any leave covers `staff` working `shift` on `day`.
    pub fn is_on_leave(&self, staff: usize, day: usize, shift: usize) -> bool {
        self.day_leave[day * self.n_staff() + staff]
            .as_ref()
            .is_some_and(|l| l.covers(shift))
    }

    /// Whether `staff` has whole-day leave on `day`.
    pub fn has_full_day_leave(&self, staff: usize, day: usize) -> bool {
        self.day_leave[day * self.n_staff() + staff]
            .as_ref()
            .is_some_and(|l| l.full_day)
    }

    /// Whether `staff` has whole-day leave on every day of the month.
    pub fn is_absent_all_month(&self, staff: usize) -> bool {
        self.absent_all_month[staff]
    }

    /// Index of a staff id.
    pub fn staff_index(&self, id: &str) -> Option<usize> {
        self.staff.iter().position(|s| s.id == id)
    }

    /// Index of a shift name.
    pub fn shift_index(&self, name: &str) -> Option<usize> {
        self.shifts.iter().position(|s| s.name == name)
    }

    /// Shift names in definition order.
    pub fn shift_names(&self) -> Vec<String> {
        self.shifts.iter().map(|s| s.name.clone()).collect()
    }

    /// Contiguous-duty limit in minutes.
    #[inline]
    pub fn max_span_minutes(&self) -> i64 {
        i64::from(self.limits.max_consecutive_working_hours) * 60
    }

    /// Total headcount required across the month.
    pub fn total_required(&self) -> u64 {
        self.requirements.iter().map(StaffRequirement::total).sum()
    }
}
