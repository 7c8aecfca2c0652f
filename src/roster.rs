//! Working assignment grid.
//!
//! The mutable state shared by the exact solver, the repair rules and the
//! audit. Days, shifts and staff are addressed by index; the grid keeps
//! both directions of the assignment relation (cell → staff and
//! day/staff → shift) plus per-staff counters, so every query the search
//! asks per decision point is O(1) or O(streak length).
//!
//! A staff member holds at most one shift per day. [`Roster::place`]
//! refuses a second one, which makes double booking unrepresentable.

use crate::models::{ConstraintModel, Role, Schedule};

/// Index-addressed monthly assignment grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    n_days: usize,
    n_staff: usize,
    n_shifts: usize,
    /// `[day * n_shifts + shift]` → staff in placement order.
    cells: Vec<Vec<usize>>,
    /// `[day * n_staff + staff]` → worked shift.
    day_shift: Vec<Option<usize>>,
    /// Per staff.
    totals: Vec<u32>,
    /// `[staff * n_shifts + shift]`.
    per_shift: Vec<u32>,
}

impl Roster {
    /// Creates an empty grid sized for a model.
    pub fn new(model: &ConstraintModel) -> Self {
        Self::with_dimensions(model.n_days(), model.n_staff(), model.n_shifts())
    }

    /// Creates an empty grid of the given dimensions.
    pub fn with_dimensions(n_days: usize, n_staff: usize, n_shifts: usize) -> Self {
        Self {
            n_days,
            n_staff,
            n_shifts,
            cells: vec![Vec::new(); n_days * n_shifts],
            day_shift: vec![None; n_days * n_staff],
            totals: vec![0; n_staff],
            per_shift: vec![0; n_staff * n_shifts],
        }
    }

    /// Number of days.
    #[inline]
    pub fn n_days(&self) -> usize {
        self.n_days
    }

    /// Assigns `staff` to `shift` on `day`.
    ///
    /// Returns `false` without changing anything if `staff` already works
    /// on `day`.
    pub fn place(&mut self, day: usize, shift: usize, staff: usize) -> bool {
        let slot = &mut self.day_shift[day * self.n_staff + staff];
        if slot.is_some() {
            return false;
        }
        *slot = Some(shift);
        self.cells[day * self.n_shifts + shift].push(staff);
        self.totals[staff] += 1;
        self.per_shift[staff * self.n_shifts + shift] += 1;
        true
    }

    /// Removes `staff`'s assignment on `day`, returning the shift it held.
    pub fn remove(&mut self, day: usize, staff: usize) -> Option<usize> {
        let shift = self.day_shift[day * self.n_staff + staff].take()?;
        self.cells[day * self.n_shifts + shift].retain(|&s| s != staff);
        self.totals[staff] -= 1;
        self.per_shift[staff * self.n_shifts + shift] -= 1;
        Some(shift)
    }

    /// Shift `staff` works on `day`.
    #[inline]
    pub fn shift_of(&self, day: usize, staff: usize) -> Option<usize> {
        self.day_shift[day * self.n_staff + staff]
    }

    /// Whether `staff` works on `day`.
    #[inline]
    pub fn is_working(&self, day: usize, staff: usize) -> bool {
        self.shift_of(day, staff).is_some()
    }

    /// Staff assigned to a cell, in placement order.
    #[inline]
    pub fn staff_in(&self, day: usize, shift: usize) -> &[usize] {
        &self.cells[day * self.n_shifts + shift]
    }

    /// Headcount of a cell.
    #[inline]
    pub fn count(&self, day: usize, shift: usize) -> usize {
        self.staff_in(day, shift).len()
    }

    /// Headcount of one role in a cell.
    pub fn role_count(&self, model: &ConstraintModel, day: usize, shift: usize, role: Role) -> u32 {
        self.staff_in(day, shift)
            .iter()
            .filter(|&&s| model.role(s) == role)
            .count() as u32
    }

    /// Missing headcount of one role in a cell.
    pub fn shortfall(&self, model: &ConstraintModel, day: usize, shift: usize, role: Role) -> u32 {
        model
            .requirement(day, shift)
            .for_role(role)
            .saturating_sub(self.role_count(model, day, shift, role))
    }

    /// Whether a cell still has an open slot for `role`.
    #[inline]
    pub fn has_open_slot(&self, model: &ConstraintModel, day: usize, shift: usize, role: Role) -> bool {
        self.shortfall(model, day, shift, role) > 0
    }

    /// Whether every cell of `day` holds exactly its requirement, per role.
    pub fn day_is_filled(&self, model: &ConstraintModel, day: usize) -> bool {
        (0..self.n_shifts).all(|shift| {
            let req = model.requirement(day, shift);
            Role::ALL
                .iter()
                .all(|&role| self.role_count(model, day, shift, role) == req.for_role(role))
        })
    }

    /// Total assignments of `staff`.
    #[inline]
    pub fn total_for(&self, staff: usize) -> u32 {
        self.totals[staff]
    }

    /// Assignments of `staff` to `shift`.
    #[inline]
    pub fn count_for_shift(&self, staff: usize, shift: usize) -> u32 {
        self.per_shift[staff * self.n_shifts + shift]
    }

    /// Total assignments in the grid.
    pub fn assignment_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Days `staff` works, ascending.
    pub fn working_days(&self, staff: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_days).filter(move |&day| self.is_working(day, staff))
    }

    /// Length of the working-day run `staff` would be in when working `day`.
    ///
    /// Counts worked days immediately before and after `day`, plus `day`.
    pub fn working_run_through(&self, day: usize, staff: usize) -> u32 {
        let before = (0..day)
            .rev()
            .take_while(|&d| self.is_working(d, staff))
            .count();
        let after = (day + 1..self.n_days)
            .take_while(|&d| self.is_working(d, staff))
            .count();
        (before + after + 1) as u32
    }

    /// Length of the night run `staff` would be in when working `shift` on
    /// `day`; zero if `shift` is not a night shift.
    pub fn night_run_through(
        &self,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> u32 {
        if !model.is_night(shift) {
            return 0;
        }
        let works_night = |d: usize| self.shift_of(d, staff).is_some_and(|k| model.is_night(k));
        let before = (0..day).rev().take_while(|&d| works_night(d)).count();
        let after = (day + 1..self.n_days).take_while(|&d| works_night(d)).count();
        (before + after + 1) as u32
    }

    /// Contiguous on-duty minutes `staff` would accumulate when working
    /// `shift` on `day`.
    ///
    /// Shifts on adjacent days chain when one ends exactly when the next
    /// starts.
    pub fn hours_span_through(
        &self,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> i64 {
        let def = &model.shifts[shift];
        let mut start = def.absolute_start(day);
        let mut end = def.absolute_end(day);

        for d in (0..day).rev() {
            match self.shift_of(d, staff) {
                Some(k) if model.shifts[k].absolute_end(d) == start => {
                    start = model.shifts[k].absolute_start(d);
                }
                _ => break,
            }
        }
        for d in day + 1..self.n_days {
            match self.shift_of(d, staff) {
                Some(k) if model.shifts[k].absolute_start(d) == end => {
                    end = model.shifts[k].absolute_end(d);
                }
                _ => break,
            }
        }
        end - start
    }

    /// Converts the grid to a date-keyed schedule.
    pub fn to_schedule(&self, model: &ConstraintModel) -> Schedule {
        let mut schedule = Schedule::empty(&model.calendar.dates, &model.shift_names());
        for (day, date) in model.calendar.dates.iter().enumerate() {
            for (shift, def) in model.shifts.iter().enumerate() {
                for &staff in self.staff_in(day, shift) {
                    schedule.assign(*date, &def.name, &model.staff[staff].id);
                }
            }
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationRequest, ShiftInput, StaffMember};
    use crate::validation::validate_request;

    fn model() -> ConstraintModel {
        let req = GenerationRequest::new("W", 2025, 4)
            .with_staff(StaffMember::nurse("n1"))
            .with_staff(StaffMember::nurse("n2"))
            .with_staff(StaffMember::assistant("a1"))
            .with_shift(ShiftInput::new("morning", "07:00", "15:00", 1, 1))
            .with_shift(ShiftInput::new("evening", "15:00", "23:00", 1, 0))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0));
        validate_request(&req).unwrap()
    }

    #[test]
    fn test_place_and_remove() {
        let m = model();
        let mut r = Roster::new(&m);
        assert!(r.place(0, 0, 0));
        assert!(!r.place(0, 1, 0)); // one shift per day
        assert!(r.place(0, 0, 2));
        assert_eq!(r.staff_in(0, 0), &[0, 2]);
        assert_eq!(r.total_for(0), 1);
        assert_eq!(r.count_for_shift(0, 0), 1);
        assert_eq!(r.role_count(&m, 0, 0, Role::Nurse), 1);
        assert_eq!(r.role_count(&m, 0, 0, Role::Assistant), 1);
        assert!(!r.has_open_slot(&m, 0, 0, Role::Nurse));

        assert_eq!(r.remove(0, 0), Some(0));
        assert_eq!(r.remove(0, 0), None);
        assert_eq!(r.total_for(0), 0);
        assert_eq!(r.staff_in(0, 0), &[2]);
        assert_eq!(r.shortfall(&m, 0, 0, Role::Nurse), 1);
    }

    #[test]
    fn test_day_is_filled() {
        let m = model();
        let mut r = Roster::new(&m);
        r.place(0, 0, 0);
        r.place(0, 0, 2);
        r.place(0, 1, 1);
        assert!(!r.day_is_filled(&m, 0));
        // Only two nurses: night cannot be filled on the same day.
        r.remove(0, 1);
        r.place(0, 2, 1);
        assert!(!r.day_is_filled(&m, 0));
    }

    #[test]
    fn test_runs() {
        let m = model();
        let mut r = Roster::new(&m);
        for day in [0, 1, 3, 4] {
            r.place(day, 2, 0);
        }
        // Filling day 2 joins both runs.
        assert_eq!(r.working_run_through(2, 0), 5);
        assert_eq!(r.night_run_through(&m, 2, 2, 0), 5);
        assert_eq!(r.night_run_through(&m, 2, 0, 0), 0);
        assert_eq!(r.working_run_through(6, 0), 1);
        assert_eq!(r.working_days(0).collect::<Vec<_>>(), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_hours_span() {
        let m = model();
        let mut r = Roster::new(&m);
        // Night on day 0 ends 07:00 day 1, morning day 1 starts 07:00.
        r.place(0, 2, 0);
        assert_eq!(r.hours_span_through(&m, 1, 0, 0), 16 * 60);
        // Evening day 1 does not chain with the night before.
        assert_eq!(r.hours_span_through(&m, 1, 1, 0), 8 * 60);
        // Morning day 2 chains forward into nothing, backward into nothing.
        assert_eq!(r.hours_span_through(&m, 2, 0, 0), 8 * 60);
    }

    #[test]
    fn test_to_schedule_has_every_cell() {
        let m = model();
        let mut r = Roster::new(&m);
        r.place(2, 1, 1);
        let schedule = r.to_schedule(&m);
        assert_eq!(schedule.days.len(), 30);
        assert!(schedule.days.values().all(|cells| cells.len() == 3));
        let date = m.calendar.dates[2];
        assert_eq!(schedule.staff_on(date, "evening"), &["n2".to_string()]);
        assert_eq!(schedule.assignment_count(), 1);
    }
}
