//! Leave, streak and hours rules.
//!
//! The streak-style rules scan each staff member's month chronologically
//! with a running counter. When the counter exceeds the limit, that day's
//! assignment is reported and the counter restarts, exactly as if the
//! assignment had already been removed. Repairing every reported violation
//! therefore leaves no violation behind, unless an earlier enforced rule
//! refuses one of the removals.

use super::{RepairContext, RepairRule, RuleViolation};
use crate::models::{ConstraintKind, ConstraintModel};
use crate::roster::Roster;

/// Requested leave is honoured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveRule;

/// Consecutive working days stay within the limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkStreakRule;

/// Consecutive night shifts stay within the limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NightStreakRule;

/// Contiguous on-duty time stays within the limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoursRule;

fn day_violation(
    kind: ConstraintKind,
    staff: usize,
    day: usize,
    shift: usize,
    observed: i64,
    limit: i64,
) -> RuleViolation {
    RuleViolation {
        kind,
        staff,
        day: Some(day),
        shift: Some(shift),
        observed,
        limit,
    }
}

/// Removes the assignment a day-anchored violation points at, if the
/// enforced rules allow it.
fn remove_assignment(
    roster: &mut Roster,
    model: &ConstraintModel,
    violation: &RuleViolation,
    ctx: &RepairContext<'_>,
) -> bool {
    match violation.day {
        Some(day) if ctx.permits_removal(roster, model, day, violation.staff) => {
            roster.remove(day, violation.staff).is_some()
        }
        _ => false,
    }
}

impl RepairRule for LeaveRule {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::UserOffDays
    }

    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation> {
        let mut violations = Vec::new();
        for staff in 0..model.n_staff() {
            for day in 0..model.n_days() {
                if let Some(shift) = roster.shift_of(day, staff) {
                    if model.is_on_leave(staff, day, shift) {
                        violations.push(day_violation(self.kind(), staff, day, shift, 1, 0));
                    }
                }
            }
        }
        violations
    }

    fn repair(
        &self,
        roster: &mut Roster,
        model: &ConstraintModel,
        violation: &RuleViolation,
        ctx: &RepairContext<'_>,
    ) -> bool {
        remove_assignment(roster, model, violation, ctx)
    }

    fn permits(
        &self,
        _roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> bool {
        !model.is_on_leave(staff, day, shift)
    }
}

impl RepairRule for WorkStreakRule {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MaxConsecutiveShifts
    }

    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation> {
        let limit = model.limits.max_consecutive_shifts;
        let mut violations = Vec::new();
        for staff in 0..model.n_staff() {
            let mut run = 0u32;
            for day in 0..model.n_days() {
                match roster.shift_of(day, staff) {
                    Some(shift) => {
                        run += 1;
                        if run > limit {
                            violations.push(day_violation(
                                self.kind(),
                                staff,
                                day,
                                shift,
                                i64::from(run),
                                i64::from(limit),
                            ));
                            run = 0;
                        }
                    }
                    None => run = 0,
                }
            }
        }
        violations
    }

    fn repair(
        &self,
        roster: &mut Roster,
        model: &ConstraintModel,
        violation: &RuleViolation,
        ctx: &RepairContext<'_>,
    ) -> bool {
        remove_assignment(roster, model, violation, ctx)
    }

    fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        _shift: usize,
        staff: usize,
    ) -> bool {
        roster.working_run_through(day, staff) <= model.limits.max_consecutive_shifts
    }
}

impl RepairRule for NightStreakRule {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MaxNightShifts
    }

    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation> {
        let limit = model.limits.max_night_shifts;
        let mut violations = Vec::new();
        for staff in 0..model.n_staff() {
            let mut nights = 0u32;
            for day in 0..model.n_days() {
                match roster.shift_of(day, staff) {
                    Some(shift) if model.is_night(shift) => {
                        nights += 1;
                        if nights > limit {
                            violations.push(day_violation(
                                self.kind(),
                                staff,
                                day,
                                shift,
                                i64::from(nights),
                                i64::from(limit),
                            ));
                            nights = 0;
                        }
                    }
                    _ => nights = 0,
                }
            }
        }
        violations
    }

    fn repair(
        &self,
        roster: &mut Roster,
        model: &ConstraintModel,
        violation: &RuleViolation,
        ctx: &RepairContext<'_>,
    ) -> bool {
        remove_assignment(roster, model, violation, ctx)
    }

    fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> bool {
        roster.night_run_through(model, day, shift, staff) <= model.limits.max_night_shifts
    }
}

impl RepairRule for HoursRule {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::MaxConsecutiveWorkingHours
    }

    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation> {
        let limit = model.max_span_minutes();
        let mut violations = Vec::new();
        for staff in 0..model.n_staff() {
            // (start, end) of the current contiguous span
            let mut chain: Option<(i64, i64)> = None;
            for day in 0..model.n_days() {
                let Some(shift) = roster.shift_of(day, staff) else {
                    chain = None;
                    continue;
                };
                let def = &model.shifts[shift];
                let (start, end) = (def.absolute_start(day), def.absolute_end(day));
                let span_start = match chain {
                    Some((s, e)) if e == start => s,
                    _ => start,
                };
                if end - span_start > limit {
                    violations.push(day_violation(
                        self.kind(),
                        staff,
                        day,
                        shift,
                        end - span_start,
                        limit,
                    ));
                    chain = None;
                } else {
                    chain = Some((span_start, end));
                }
            }
        }
        violations
    }

    fn repair(
        &self,
        roster: &mut Roster,
        model: &ConstraintModel,
        violation: &RuleViolation,
        ctx: &RepairContext<'_>,
    ) -> bool {
        remove_assignment(roster, model, violation, ctx)
    }

    fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> bool {
        roster.hours_span_through(model, day, shift, staff) <= model.max_span_minutes()
    }
}
