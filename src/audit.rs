//! Violation detection on finished rosters.
//!
//! Reports every staffing mismatch and every rule breach in a roster, in a
//! form callers can show next to the schedule. The same checks run on
//! edited schedules through [`audit_schedule`].

use std::collections::HashMap;

use crate::models::{
    ConstraintKind, ConstraintModel, Role, Schedule, Violation, ViolationType,
};
use crate::repair::{rule_for, RuleViolation};
use crate::roster::Roster;

/// Detects staffing mismatches and rule breaches.
///
/// Staffing is checked cell by cell and role by role; rules are checked in
/// the model's priority order.
pub fn audit(roster: &Roster, model: &ConstraintModel) -> Vec<Violation> {
    let mut violations = staffing_violations(roster, model);
    for &kind in model.priority.kinds() {
        let rule = rule_for(kind);
        violations.extend(
            rule.detect(roster, model)
                .iter()
                .map(|v| describe(model, v)),
        );
    }
    violations
}

/// Audits a date-keyed schedule, such as one edited after generation.
///
/// A staff member listed in several shifts on one date is reported as
/// double booked and audited on the first of them. Dates, shifts and staff
/// ids unknown to the model are ignored.
pub fn audit_schedule(schedule: &Schedule, model: &ConstraintModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut roster = Roster::new(model);

    for (day, date) in model.calendar.dates.iter().enumerate() {
        let Some(cells) = schedule.days.get(date) else {
            continue;
        };
        let mut seen: HashMap<usize, usize> = HashMap::new();
        for (shift, def) in model.shifts.iter().enumerate() {
            for id in cells.get(&def.name).into_iter().flatten() {
                let Some(staff) = model.staff_index(id) else {
                    continue;
                };
                match seen.get(&staff) {
                    Some(&first) if first != shift => violations.push(Violation::new(
                        ViolationType::DoubleBooked,
                        id.clone(),
                        Some(*date),
                        format!(
                            "{id} is assigned to both {} and {} on {date}",
                            model.shifts[first].name, def.name
                        ),
                    )),
                    Some(_) => {}
                    None => {
                        seen.insert(staff, shift);
                        roster.place(day, shift, staff);
                    }
                }
            }
        }
    }

    violations.extend(audit(&roster, model));
    violations
}

fn staffing_violations(roster: &Roster, model: &ConstraintModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (day, date) in model.calendar.dates.iter().enumerate() {
        for (shift, def) in model.shifts.iter().enumerate() {
            let required = model.requirement(day, shift);
            for role in Role::ALL {
                let want = required.for_role(role);
                let have = roster.role_count(model, day, shift, role);
                let violation_type = if have < want {
                    ViolationType::Understaffed
                } else if have > want {
                    ViolationType::Overstaffed
                } else {
                    continue;
                };
                violations.push(Violation::new(
                    violation_type,
                    def.name.clone(),
                    Some(*date),
                    format!(
                        "{} on {date}: {have} of {want} {} assigned",
                        def.name,
                        role.as_str()
                    ),
                ));
            }
        }
    }
    violations
}

/// Converts a rule violation into a reportable one.
pub fn describe(model: &ConstraintModel, v: &RuleViolation) -> Violation {
    let staff_id = model.staff[v.staff].id.clone();
    let date = v.day.and_then(|day| model.calendar.date(day));
    let on = date.map(|d| format!(" on {d}")).unwrap_or_default();
    let shift_name = v.shift.map(|k| model.shifts[k].name.as_str()).unwrap_or("");

    let (violation_type, message) = match v.kind {
        ConstraintKind::UserOffDays => (
            ViolationType::LeaveConflict,
            format!("{staff_id} works {shift_name}{on} despite requested leave"),
        ),
        ConstraintKind::MaxConsecutiveShifts => (
            ViolationType::ConsecutiveShifts,
            format!(
                "{staff_id} works {} consecutive days{on} (limit {})",
                v.observed, v.limit
            ),
        ),
        ConstraintKind::MaxNightShifts => (
            ViolationType::ConsecutiveNightShifts,
            format!(
                "{staff_id} works {} consecutive night shifts{on} (limit {})",
                v.observed, v.limit
            ),
        ),
        ConstraintKind::MaxConsecutiveWorkingHours => (
            ViolationType::ConsecutiveWorkingHours,
            format!(
                "{staff_id} is on duty {}h{:02} without a break{on} (limit {}h)",
                v.observed / 60,
                v.observed % 60,
                v.limit / 60
            ),
        ),
        ConstraintKind::MaxShiftDiff => (
            ViolationType::ShiftSpread,
            format!(
                "{} shift totals spread by {} (limit {}); most assigned: {staff_id}",
                model.role(v.staff).as_str(),
                v.observed,
                v.limit
            ),
        ),
        ConstraintKind::MaxShiftDiffPerType => (
            ViolationType::ShiftTypeSpread,
            format!(
                "{} {shift_name} counts spread by {} (limit {}); most assigned: {staff_id}",
                model.role(v.staff).as_str(),
                v.observed,
                v.limit
            ),
        ),
    };
    Violation::new(violation_type, staff_id, date, message)
}
