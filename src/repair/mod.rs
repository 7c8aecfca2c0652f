//! Priority-ordered relaxation.
//!
//! Used when the exact search cannot certify a roster. Builds a best-effort
//! roster in three steps:
//!
//! 1. **Seed**: fill every cell, per role, with staff who are free that day
//!    and not on leave for the cell, fewest assignments first.
//! 2. **Fold**: enforce one [`RepairRule`] at a time, in the model's
//!    priority order. Each rule detects its violations and repairs them.
//! 3. **Backfill**: after each rule, refill understaffed cells with staff
//!    that every rule enforced so far permits.
//!
//! Every addition and every removal is checked against the rules enforced
//! so far. A later rule whose repair would break an earlier one leaves its
//! own violation in place, so the caller's priority order decides which
//! rule gives way. Cells with no permitted candidate stay short. Nobody
//! ever works two shifts on one day.

mod balance;
mod rules;

pub use balance::SpreadRule;
pub use rules::{HoursRule, LeaveRule, NightStreakRule, WorkStreakRule};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::{ConstraintKind, ConstraintModel, Role};
use crate::roster::Roster;
use crate::solver::{ProgressReporter, SEARCH_PROGRESS_END};

/// Highest progress value reported during relaxation.
pub const RELAX_PROGRESS_END: u8 = 99;

/// One detected breach of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    /// Broken rule.
    pub kind: ConstraintKind,
    /// Staff member concerned (the most assigned one for spreads).
    pub staff: usize,
    /// Day concerned, for day-anchored violations.
    pub day: Option<usize>,
    /// Shift concerned: the worked shift, or the shift name of a per-type
    /// spread.
    pub shift: Option<usize>,
    /// Measured value (run length, minutes or spread).
    pub observed: i64,
    /// Configured limit in the same unit.
    pub limit: i64,
}

/// A constraint that can be detected, repaired and consulted.
pub trait RepairRule: Send + Sync {
    /// Constraint kind enforced.
    fn kind(&self) -> ConstraintKind;

    /// Lists current violations.
    fn detect(&self, roster: &Roster, model: &ConstraintModel) -> Vec<RuleViolation>;

    /// Repairs one violation reported by [`RepairRule::detect`].
    ///
    /// Returns whether the violation was resolved.
    fn repair(
        &self,
        roster: &mut Roster,
        model: &ConstraintModel,
        violation: &RuleViolation,
        ctx: &RepairContext<'_>,
    ) -> bool;

    /// Whether adding `staff` to `shift` on `day` keeps this rule satisfied.
    fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> bool;

    /// Whether removing `staff`'s assignment on `day` keeps this rule
    /// satisfied. Only spreads can be broken by a removal.
    fn permits_removal(
        &self,
        _roster: &Roster,
        _model: &ConstraintModel,
        _day: usize,
        _staff: usize,
    ) -> bool {
        true
    }
}

/// Rules enforced so far, consulted before any assignment is added or
/// removed.
pub struct RepairContext<'a> {
    enforced: &'a [Box<dyn RepairRule>],
}

impl<'a> RepairContext<'a> {
    /// Creates a context over already-enforced rules.
    pub fn new(enforced: &'a [Box<dyn RepairRule>]) -> Self {
        Self { enforced }
    }

    /// Whether `staff` may be added to `shift` on `day`: free that day, an
    /// open slot for their role, and every enforced rule permits it.
    pub fn permits(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        shift: usize,
        staff: usize,
    ) -> bool {
        !roster.is_working(day, staff)
            && roster.has_open_slot(model, day, shift, model.role(staff))
            && self
                .enforced
                .iter()
                .all(|rule| rule.permits(roster, model, day, shift, staff))
    }

    /// Whether `staff`'s assignment on `day` may be removed: they work that
    /// day and every enforced rule permits the removal.
    pub fn permits_removal(
        &self,
        roster: &Roster,
        model: &ConstraintModel,
        day: usize,
        staff: usize,
    ) -> bool {
        roster.is_working(day, staff)
            && self
                .enforced
                .iter()
                .all(|rule| rule.permits_removal(roster, model, day, staff))
    }
}

/// Builds the rule for a constraint kind.
pub fn rule_for(kind: ConstraintKind) -> Box<dyn RepairRule> {
    match kind {
        ConstraintKind::UserOffDays => Box::new(LeaveRule),
        ConstraintKind::MaxConsecutiveShifts => Box::new(WorkStreakRule),
        ConstraintKind::MaxNightShifts => Box::new(NightStreakRule),
        ConstraintKind::MaxConsecutiveWorkingHours => Box::new(HoursRule),
        ConstraintKind::MaxShiftDiff => Box::new(SpreadRule::total()),
        ConstraintKind::MaxShiftDiffPerType => Box::new(SpreadRule::per_type()),
    }
}

/// Builds every rule in the model's priority order.
pub fn rules_in_priority(model: &ConstraintModel) -> Vec<Box<dyn RepairRule>> {
    model.priority.kinds().iter().map(|&k| rule_for(k)).collect()
}

/// Per-rule relaxation counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    pub kind: ConstraintKind,
    /// Violations found when the rule was enforced.
    pub detected: usize,
    /// Violations the rule resolved.
    pub repaired: usize,
    /// Assignments added by the backfill that followed.
    pub backfilled: usize,
}

/// Relaxation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaxationReport {
    /// Assignments made by the seed.
    pub seeded: usize,
    /// One entry per enforced rule, in enforcement order.
    pub rules: Vec<RuleReport>,
}

/// Result of a relaxation run.
#[derive(Debug, Clone)]
pub enum RelaxOutcome {
    /// All rules were enforced.
    Completed {
        roster: Roster,
        report: RelaxationReport,
    },
    /// The caller cancelled between rules.
    Cancelled { partial: Roster },
}

/// Runs the relaxation pass.
///
/// Reports progress from the end of the search range up to
/// [`RELAX_PROGRESS_END`], one step per rule.
pub fn relax(
    model: &ConstraintModel,
    cancel: &CancellationToken,
    progress: &mut ProgressReporter<'_>,
) -> RelaxOutcome {
    let mut roster = Roster::new(model);
    let mut report = RelaxationReport {
        seeded: seed(&mut roster, model),
        rules: Vec::new(),
    };
    debug!(seeded = report.seeded, "relaxation seed placed");

    let rules = rules_in_priority(model);
    for (i, rule) in rules.iter().enumerate() {
        if cancel.is_cancelled() {
            return RelaxOutcome::Cancelled { partial: roster };
        }
        let ctx = RepairContext::new(&rules[..=i]);

        let violations = rule.detect(&roster, model);
        let repaired = violations
            .iter()
            .filter(|v| rule.repair(&mut roster, model, v, &ctx))
            .count();
        let backfilled = backfill(&mut roster, model, &ctx);

        debug!(
            rule = %rule.kind(),
            detected = violations.len(),
            repaired,
            backfilled,
            "rule enforced"
        );
        report.rules.push(RuleReport {
            kind: rule.kind(),
            detected: violations.len(),
            repaired,
            backfilled,
        });
        progress.report_fraction(i + 1, rules.len(), SEARCH_PROGRESS_END, RELAX_PROGRESS_END);
    }

    RelaxOutcome::Completed { roster, report }
}

/// Fills every cell, per role, with staff free on the day and not on
/// leave for the cell. Returns the number of assignments made.
pub fn seed(roster: &mut Roster, model: &ConstraintModel) -> usize {
    fill(roster, model, |roster, day, shift, staff| {
        !roster.is_working(day, staff) && !model.is_on_leave(staff, day, shift)
    })
}

/// Fills understaffed cells with staff every enforced rule permits.
/// Returns the number of assignments made.
pub fn backfill(roster: &mut Roster, model: &ConstraintModel, ctx: &RepairContext<'_>) -> usize {
    fill(roster, model, |roster, day, shift, staff| {
        ctx.permits(roster, model, day, shift, staff)
    })
}

/// Tops up every cell with eligible staff of the right role, fewest
/// assignments first, ties in traversal order.
fn fill<F>(roster: &mut Roster, model: &ConstraintModel, eligible: F) -> usize
where
    F: Fn(&Roster, usize, usize, usize) -> bool,
{
    let mut placed = 0;
    for day in 0..model.n_days() {
        for shift in 0..model.n_shifts() {
            for role in Role::ALL {
                while roster.has_open_slot(model, day, shift, role) {
                    let candidate = {
                        let current: &Roster = roster;
                        least_assigned(
                            model.traversal.iter().copied().filter(|&s| {
                                model.role(s) == role && eligible(current, day, shift, s)
                            }),
                            |s| current.total_for(s),
                        )
                    };
                    match candidate {
                        Some(staff) if roster.place(day, shift, staff) => placed += 1,
                        _ => break,
                    }
                }
            }
        }
    }
    placed
}

/// Staff with the lowest `count`; the first in iteration order on ties.
pub(crate) fn least_assigned<I, C>(candidates: I, count: C) -> Option<usize>
where
    I: Iterator<Item = usize>,
    C: Fn(usize) -> u32,
{
    let mut best: Option<(usize, u32)> = None;
    for staff in candidates {
        let c = count(staff);
        if best.map_or(true, |(_, b)| c < b) {
            best = Some((staff, c));
        }
    }
    best.map(|(staff, _)| staff)
}
