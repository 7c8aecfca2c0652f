//! Workload spread rules.
//!
//! Spread is measured per role, between the most and the least assigned
//! staff member, over the whole month or per shift name. Staff on leave for
//! the entire month are left out of the measure.
//!
//! Repair moves, tried in order until the spread is within the limit:
//! 1. Add the least assigned staff member to an understaffed cell.
//! 2. Hand one of the most assigned staff member's cells to the least
//!    assigned one; per shift name, swapping shifts on a day both work.
//! 3. Remove one assignment from the most assigned staff member.
//!
//! Every move only adds and removes assignments the enforced rules permit.

use super::{RepairContext, RepairRule, RuleViolation};
use crate::models::{ConstraintKind, ConstraintModel, Role};
use crate::roster::Roster;

/// Spread of total or per-shift assignment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadRule {
    per_type: bool,
}

/// Extremes of a group: `(least staff, least count, most staff, most count)`.
type Extremes = (usize, u32, usize, u32);

impl SpreadRule {
    /// Spread of total assignments.
    pub fn total() -> Self {
        Self { per_type: false }
    }

    /// Spread of assignments per shift name.
    pub fn per_type() -> Self {
        Self { per_type: true }
    }

    fn limit(&self, model: &ConstraintModel) -> u32 {
        if self.per_type {
            model.limits.max_shift_diff_per_type
        } else {
            model.limits.max_shift_diff
        }
    }

    fn count(roster: &Roster, staff: usize, scope: Option<usize>) -> u32 {
        match scope {
            Some(shift) => roster.count_for_shift(staff, shift),
            None => roster.total_for(staff),
        }
    }

    /// Staff of `role` taking part in the measure, in traversal order.
    fn members(model: &ConstraintModel, role: Role) -> Vec<usize> {
        model
            .traversal
            .iter()
            .copied()
            .filter(|&s| model.role(s) == role && !model.is_absent_all_month(s))
            .collect()
    }

    /// Least and most assigned members; first in traversal order on ties.
    fn extremes(roster: &Roster, members: &[usize], scope: Option<usize>) -> Option<Extremes> {
        let (&first, rest) = members.split_first()?;
        let c = Self::count(roster, first, scope);
        let mut ext = (first, c, first, c);
        for &staff in rest {
            let c = Self::count(roster, staff, scope);
            if c < ext.1 {
                ext.0 = staff;
                ext.1 = c;
            }
            if c > ext.3 {
                ext.2 = staff;
                ext.3 = c;
            }
        }
        Some(ext)
    }

    fn scope_shifts(model: &ConstraintModel, scope: Option<usize>) -> Vec<usize> {
        match scope {
            Some(shift) => vec![shift],
            None => (0..model.n_shifts()).collect(),
        }
    }

    /// Whether giving `staff` one more (`adding`) or one fewer assignment in
    /// `scope` keeps the spread within the limit, or at least no wider.
    fn keeps_spread(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        scope: Option<usize>,
        staff: usize,
        adding: bool,
    ) -> bool {
        let members = Self::members(model, model.role(staff));
        if !members.contains(&staff) {
            return true;
        }

        let (mut low, mut high) = (u32::MAX, 0);
        let (mut new_low, mut new_high) = (u32::MAX, 0);
        for &m in &members {
            let c = Self::count(roster, m, scope);
            let after = match (m == staff, adding) {
                (true, true) => c + 1,
                (true, false) => c.saturating_sub(1),
                (false, _) => c,
            };
            low = low.min(c);
            high = high.max(c);
            new_low = new_low.min(after);
            new_high = new_high.max(after);
        }
        new_high - new_low <= self.limit(model).max(high - low)
    }

    /// Move 1.
    fn add_least(
        roster: &mut Roster,
        model: &ConstraintModel,
        ctx: &RepairContext<'_>,
        least: usize,
        scope: Option<usize>,
    ) -> bool {
        let shifts = Self::scope_shifts(model, scope);
        for day in 0..model.n_days() {
            for &shift in &shifts {
                if ctx.permits(roster, model, day, shift, least) {
                    return roster.place(day, shift, least);
                }
            }
        }
        false
    }

    /// Move 2.
    fn transfer(
        roster: &mut Roster,
        model: &ConstraintModel,
        ctx: &RepairContext<'_>,
        most: usize,
        least: usize,
        scope: Option<usize>,
    ) -> bool {
        for day in 0..model.n_days() {
            let Some(shift) = roster.shift_of(day, most) else {
                continue;
            };
            if scope.is_some_and(|k| k != shift) {
                continue;
            }
            match roster.shift_of(day, least) {
                None if ctx.permits_removal(roster, model, day, most) => {
                    roster.remove(day, most);
                    if ctx.permits(roster, model, day, shift, least) {
                        return roster.place(day, shift, least);
                    }
                    roster.place(day, shift, most);
                }
                Some(other) if scope.is_some() && other != shift => {
                    roster.remove(day, most);
                    roster.remove(day, least);
                    if ctx.permits(roster, model, day, shift, least) {
                        roster.place(day, shift, least);
                        if ctx.permits(roster, model, day, other, most) {
                            return roster.place(day, other, most);
                        }
                        roster.remove(day, least);
                    }
                    roster.place(day, shift, most);
                    roster.place(day, other, least);
                }
                _ => {}
            }
        }
        false
    }

    /// Move 3: drops the most assigned member's latest assignment in scope
    /// that the enforced rules allow removing.
    fn remove_most(
        roster: &mut Roster,
        model: &ConstraintModel,
        ctx: &RepairContext<'_>,
        most: usize,
        scope: Option<usize>,
    ) -> bool {
        let current: &Roster = roster;
        let latest = (0..model.n_days()).rev().find(|&day| {
            current
                .shift_of(day, most)
                .is_some_and(|k| scope.map_or(true, |s| s == k))
                && ctx.permits_removal(current, model, day, most)
        });
        match latest {
            Some(day) => roster.remove(day, most).is_some(),
            None => false,
        }
    }
}

impl RepairRule for SpreadRule {
    fn kind(&self) -> ConstraintKind {
        if self.per_type {
            ConstraintKind::MaxShiftDiffPerType
        } else {
            ConstraintKind::MaxShiftDiff
        }
    }

    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation> {
        let limit = self.limit(model);
        let scopes: Vec<Option<usize>> = if self.per_type {
            (0..model.n_shifts()).map(Some).collect()
        } else {
            vec![None]
        };

        let mut violations = Vec::new();
        for role in Role::ALL {
            let members = Self::members(model, role);
            for &scope in &scopes {
                let Some((_, least, most_staff, most)) = Self::extremes(roster, &members, scope)
                else {
                    continue;
                };
                if most - least > limit {
                    violations.push(RuleViolation {
                        kind: self.kind(),
                        staff: most_staff,
                        day: None,
                        shift: scope,
                        observed: i64::from(most - least),
                        limit: i64::from(limit),
                    });
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
        let scope = if self.per_type {
            match violation.shift {
                Some(shift) => Some(shift),
                None => return false,
            }
        } else {
            None
        };
        let limit = self.limit(model);
        let members = Self::members(model, model.role(violation.staff));
        let max_iterations = 2 * model.n_days() * model.n_shifts().max(1) * members.len();

        for _ in 0..max_iterations {
            let Some((least, low, most, high)) = Self::extremes(roster, &members, scope) else {
                return true;
            };
            if high - low <= limit {
                return true;
            }
            if Self::add_least(roster, model, ctx, least, scope)
                || Self::transfer(roster, model, ctx, most, least, scope)
            {
                continue;
            }
            if !Self::remove_most(roster, model, ctx, most, scope) {
                return false;
            }
        }
        Self::extremes(roster, &members, scope).map_or(true, |(_, low, _, high)| high - low <= limit)
    }

    fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        _day: usize,
        shift: usize,
        staff: usize,
    ) -> bool {
        self.keeps_spread(roster, model, self.per_type.then_some(shift), staff, true)
    }

    fn permits_removal(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        staff: usize,
    ) -> bool {
        match roster.shift_of(day, staff) {
            Some(shift) => {
                self.keeps_spread(roster, model, self.per_type.then_some(shift), staff, false)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintLimits, GenerationRequest, LeaveRequest, ShiftInput, StaffMember,
    };
    use crate::repair::LeaveRule;
    use crate::validation::validate_request;
    use chrono::NaiveDate;

    fn request(nurses: usize, shifts: &[(&str, &str, &str)]) -> GenerationRequest {
        let mut req = GenerationRequest::new("W", 2025, 4);
        for i in 1..=nurses {
            req = req.with_staff(StaffMember::nurse(format!("n{i}")));
        }
        for (name, start, end) in shifts {
            req = req.with_shift(ShiftInput::new(*name, *start, *end, 1, 0));
        }
        req
    }

    fn repair_all(rule: &SpreadRule, roster: &mut Roster, model: &ConstraintModel, ctx_rules: &[Box<dyn RepairRule>]) {
        let ctx = RepairContext::new(ctx_rules);
        for v in rule.detect(roster, model) {
            rule.repair(roster, model, &v, &ctx);
        }
    }

    #[test]
    fn test_total_spread_transfers() {
        let model = validate_request(&request(3, &[("day", "08:00", "16:00")])).unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..30 {
            roster.place(day, 0, 0);
        }
        let rule = SpreadRule::total();
        let violations = rule.detect(&roster, &model);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].staff, 0);
        assert_eq!(violations[0].observed, 30);

        let enforced: Vec<Box<dyn RepairRule>> = vec![Box::new(rule)];
        repair_all(&rule, &mut roster, &model, &enforced);

        assert_eq!(roster.assignment_count(), 30);
        let totals: Vec<u32> = (0..3).map(|s| roster.total_for(s)).collect();
        let spread = totals.iter().max().unwrap() - totals.iter().min().unwrap();
        assert!(spread <= 3, "totals {totals:?}");
        assert!(rule.detect(&roster, &model).is_empty());
    }

    #[test]
    fn test_per_type_spread_swaps() {
        let model = validate_request(&request(
            2,
            &[("morning", "07:00", "15:00"), ("evening", "15:00", "23:00")],
        ))
        .unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..30 {
            roster.place(day, 0, 0);
            roster.place(day, 1, 1);
        }
        let rule = SpreadRule::per_type();
        assert_eq!(rule.detect(&roster, &model).len(), 2);

        let enforced: Vec<Box<dyn RepairRule>> = vec![Box::new(rule)];
        repair_all(&rule, &mut roster, &model, &enforced);

        assert_eq!(roster.assignment_count(), 60);
        for shift in 0..2 {
            let a = roster.count_for_shift(0, shift);
            let b = roster.count_for_shift(1, shift);
            assert!(a.abs_diff(b) <= 2, "shift {shift}: {a} vs {b}");
        }
    }

    #[test]
    fn test_removal_when_moves_blocked() {
        let mut req = request(2, &[("day", "08:00", "16:00")]).with_limits(ConstraintLimits {
            max_shift_diff: 3,
            ..ConstraintLimits::default()
        });
        for day in 1..=29 {
            req = req.with_leave(LeaveRequest::full_day(
                "n2",
                NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            ));
        }
        let model = validate_request(&req).unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..10 {
            roster.place(day, 0, 0);
        }
        let rule = SpreadRule::total();
        let enforced: Vec<Box<dyn RepairRule>> = vec![Box::new(LeaveRule), Box::new(rule)];
        repair_all(&rule, &mut roster, &model, &enforced);

        // n2 can only work day 30; n1 is trimmed to within 3 of that.
        assert_eq!(roster.total_for(1), 1);
        assert!(roster.is_working(29, 1));
        assert_eq!(roster.total_for(0), 4);
        assert_eq!((0..4).filter(|&d| roster.is_working(d, 0)).count(), 4);
    }

    #[test]
    fn test_absent_staff_excluded() {
        let mut req = request(2, &[("day", "08:00", "16:00")]);
        for day in 1..=30 {
            req = req.with_leave(LeaveRequest::full_day(
                "n2",
                NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            ));
        }
        let model = validate_request(&req).unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..30 {
            roster.place(day, 0, 0);
        }
        assert!(SpreadRule::total().detect(&roster, &model).is_empty());
    }

    #[test]
    fn test_permits_does_not_widen_spread() {
        let model = validate_request(&request(2, &[("day", "08:00", "16:00")])).unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..3 {
            roster.place(day, 0, 0);
        }
        let rule = SpreadRule::total();
        // n1 has 3, n2 has 0, limit 3.
        assert!(!rule.permits(&roster, &model, 5, 0, 0));
        assert!(rule.permits(&roster, &model, 5, 0, 1));
    }

    #[test]
    fn test_removal_refused_when_it_widens_spread() {
        let model = validate_request(&request(2, &[("day", "08:00", "16:00")])).unwrap();
        let mut roster = Roster::new(&model);
        for day in 0..4 {
            roster.place(day, 0, 0);
        }
        roster.place(10, 0, 1);
        let rule = SpreadRule::total();
        // n1 has 4, n2 has 1, limit 3.
        assert!(!rule.permits_removal(&roster, &model, 10, 1));
        assert!(rule.permits_removal(&roster, &model, 0, 0));
        assert!(rule.permits_removal(&roster, &model, 20, 1));

        let enforced: Vec<Box<dyn RepairRule>> = vec![Box::new(rule)];
        let ctx = RepairContext::new(&enforced);
        assert!(!ctx.permits_removal(&roster, &model, 10, 1));
        assert!(!ctx.permits_removal(&roster, &model, 20, 1));
    }
}
