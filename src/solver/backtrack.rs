//! Exact roster search.
//!
//! Depth-first backtracking over decision points `(day, staff)`, visited
//! day by day and, within a day, in the model's staff traversal order. At
//! each decision point the staff member either takes one shift (tried in
//! definition order) or takes none.
//!
//! # Algorithm
//! 1. A shift is a candidate only if its slot for the staff member's role is
//!    open and the assignment keeps leave, working streak, night streak and
//!    contiguous hours within limits.
//! 2. After the last staff member of a day, the day closes only if every
//!    cell holds exactly its requirement.
//! 3. After every decision, the open slots of the day must not exceed the
//!    number of remaining, available staff of each role (suffix capacity).
//!
//! The search keeps an explicit stack of choice points instead of
//! recursing, so month-sized problems cannot overflow the call stack.
//!
//! # Complexity
//! Worst case O((S+1)^(D*N)) for S shifts, D days and N staff; bounded in
//! practice by the time and node budgets.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::control::{ProgressReporter, SearchControl, StopReason};
use crate::models::{ConstraintModel, Role};
use crate::roster::Roster;

/// Share of the progress range covered by the exact search.
pub const SEARCH_PROGRESS_END: u8 = 80;

/// Why the search ended without a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExhaustReason {
    /// Every branch was explored.
    SpaceExhausted,
    /// The time budget ran out.
    TimeBudget,
    /// The node budget ran out.
    NodeBudget,
}

/// Result of an exact search.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// A roster satisfying every hard constraint.
    Found(Roster),
    /// No roster was certified.
    Exhausted { reason: ExhaustReason },
    /// The caller cancelled; `partial` holds the grid at that moment.
    Cancelled { partial: Roster },
}

impl SearchOutcome {
    /// Whether a roster was found.
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Search counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Decision points visited.
    pub nodes: u64,
    /// Choice points abandoned after all options failed.
    pub backtracks: u64,
    /// Deepest decision point reached.
    pub max_depth: usize,
    /// Total decision points.
    pub decision_points: usize,
    /// Wall-clock time spent.
    pub elapsed_ms: u64,
}

/// One decision point on the stack.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    /// Next option: shift index, `n_shifts` for "none", beyond that done.
    next: usize,
    /// Shift currently placed by this frame.
    placed: Option<usize>,
}

/// Depth-first exact solver.
///
/// # Example
/// ```no_run
/// use u_roster::models::GenerationRequest;
/// use u_roster::solver::{ExactSolver, ProgressReporter, SearchBudget, SearchControl};
/// use u_roster::validation::validate_request;
/// use tokio_util::sync::CancellationToken;
///
/// # let request = GenerationRequest::new("W1", 2025, 4);
/// let model = validate_request(&request).unwrap();
/// let mut control = SearchControl::start(SearchBudget::from_millis(1_000), CancellationToken::new());
/// let (outcome, stats) = ExactSolver::new(&model).solve(&mut control, &mut ProgressReporter::silent());
/// println!("{} nodes, found: {}", stats.nodes, outcome.is_found());
/// ```
#[derive(Debug)]
pub struct ExactSolver<'m> {
    model: &'m ConstraintModel,
    /// `[day * (n_staff + 1) + pos]` → available staff per role at
    /// traversal positions `pos..`.
    suffix_capacity: Vec<[u32; 2]>,
}

impl<'m> ExactSolver<'m> {
    /// Prepares a solver for a model.
    pub fn new(model: &'m ConstraintModel) -> Self {
        let n_staff = model.n_staff();
        let mut suffix_capacity = vec![[0u32; 2]; model.n_days() * (n_staff + 1)];
        for day in 0..model.n_days() {
            let base = day * (n_staff + 1);
            for pos in (0..n_staff).rev() {
                let staff = model.traversal[pos];
                let mut cap = suffix_capacity[base + pos + 1];
                if !model.has_full_day_leave(staff, day) {
                    cap[model.role(staff).index()] += 1;
                }
                suffix_capacity[base + pos] = cap;
            }
        }
        Self {
            model,
            suffix_capacity,
        }
    }

    /// Runs the search.
    pub fn solve(
        &self,
        control: &mut SearchControl,
        progress: &mut ProgressReporter<'_>,
    ) -> (SearchOutcome, SearchStats) {
        let started = Instant::now();
        let model = self.model;
        let n_staff = model.n_staff();
        let n_shifts = model.n_shifts();
        let total = model.n_days() * n_staff;

        let mut stats = SearchStats {
            decision_points: total,
            ..SearchStats::default()
        };
        let mut roster = Roster::new(model);
        progress.report(0);

        let finish = |outcome: SearchOutcome, mut stats: SearchStats, control: &SearchControl| {
            stats.nodes = control.nodes();
            stats.elapsed_ms = started.elapsed().as_millis() as u64;
            debug!(
                nodes = stats.nodes,
                backtracks = stats.backtracks,
                max_depth = stats.max_depth,
                found = outcome.is_found(),
                "exact search finished"
            );
            (outcome, stats)
        };

        if let Some(day) = self.first_unfillable_day() {
            debug!(day, "day cannot be staffed by the available roster");
            return finish(
                SearchOutcome::Exhausted {
                    reason: ExhaustReason::SpaceExhausted,
                },
                stats,
                control,
            );
        }
        if total == 0 {
            // No staff and nothing required: the empty roster is exact.
            return finish(SearchOutcome::Found(roster), stats, control);
        }

        let mut stack: Vec<Frame> = Vec::with_capacity(total);
        stack.push(Frame::default());

        loop {
            let depth = match stack.len() {
                0 => {
                    return finish(
                        SearchOutcome::Exhausted {
                            reason: ExhaustReason::SpaceExhausted,
                        },
                        stats,
                        control,
                    )
                }
                len => len - 1,
            };

            if let Some(reason) = control.tick() {
                let outcome = match reason {
                    StopReason::Cancelled => SearchOutcome::Cancelled { partial: roster },
                    StopReason::TimeBudget => SearchOutcome::Exhausted {
                        reason: ExhaustReason::TimeBudget,
                    },
                    StopReason::NodeBudget => SearchOutcome::Exhausted {
                        reason: ExhaustReason::NodeBudget,
                    },
                };
                return finish(outcome, stats, control);
            }

            if depth > stats.max_depth {
                stats.max_depth = depth;
                progress.report_fraction(depth, total, 0, SEARCH_PROGRESS_END);
            }

            let day = depth / n_staff;
            let pos = depth % n_staff;
            let staff = model.traversal[pos];

            let Some(frame) = stack.last_mut() else {
                continue;
            };
            if frame.placed.take().is_some() {
                roster.remove(day, staff);
            }

            let mut chosen = None;
            while frame.next <= n_shifts {
                let option = frame.next;
                frame.next += 1;
                if option == n_shifts {
                    chosen = Some(None);
                    break;
                }
                if self.can_place(&roster, day, option, staff) {
                    chosen = Some(Some(option));
                    break;
                }
            }

            let Some(choice) = chosen else {
                stack.pop();
                stats.backtracks += 1;
                continue;
            };
            if let Some(shift) = choice {
                roster.place(day, shift, staff);
                frame.placed = Some(shift);
            }

            if pos + 1 == n_staff {
                if !roster.day_is_filled(model, day) {
                    continue;
                }
                if depth + 1 == total {
                    progress.report(SEARCH_PROGRESS_END);
                    return finish(SearchOutcome::Found(roster), stats, control);
                }
            } else if !self.day_can_fill(&roster, day, pos + 1) {
                continue;
            }

            stack.push(Frame::default());
        }
    }

    /// Whether `staff` may take `shift` on `day`, given the assignments made
    /// so far.
    fn can_place(&self, roster: &Roster, day: usize, shift: usize, staff: usize) -> bool {
        let model = self.model;
        let limits = &model.limits;
        roster.has_open_slot(model, day, shift, model.role(staff))
            && !model.is_on_leave(staff, day, shift)
            && roster.working_run_through(day, staff) <= limits.max_consecutive_shifts
            && roster.night_run_through(model, day, shift, staff) <= limits.max_night_shifts
            && roster.hours_span_through(model, day, shift, staff) <= model.max_span_minutes()
    }

    /// Whether the open slots of `day` can still be covered by the staff at
    /// traversal positions `pos..`.
    fn day_can_fill(&self, roster: &Roster, day: usize, pos: usize) -> bool {
        let capacity = self.suffix_capacity[day * (self.model.n_staff() + 1) + pos];
        Role::ALL.iter().all(|&role| {
            let open: u64 = (0..self.model.n_shifts())
                .map(|shift| u64::from(roster.shortfall(self.model, day, shift, role)))
                .sum();
            open <= u64::from(capacity[role.index()])
        })
    }

    /// First day whose requirement exceeds the staff available on it.
    fn first_unfillable_day(&self) -> Option<usize> {
        let model = self.model;
        (0..model.n_days()).find(|&day| {
            let capacity = self.suffix_capacity[day * (model.n_staff() + 1)];
            Role::ALL.iter().any(|&role| {
                let required: u64 = (0..model.n_shifts())
                    .map(|shift| u64::from(model.requirement(day, shift).for_role(role)))
                    .sum();
                required > u64::from(capacity[role.index()])
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        GenerationRequest, LeaveRequest, RequirementOverride, ShiftInput, StaffMember,
    };
    use crate::solver::control::SearchBudget;
    use crate::validation::validate_request;
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn three_shifts(nurses: usize) -> GenerationRequest {
        let mut req = GenerationRequest::new("W", 2025, 4)
            .with_shift(ShiftInput::new("morning", "07:00", "15:00", 1, 0))
            .with_shift(ShiftInput::new("evening", "15:00", "23:00", 1, 0))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0));
        for i in 1..=nurses {
            req = req.with_staff(StaffMember::nurse(format!("n{i}")));
        }
        req
    }

    fn run(model: &ConstraintModel, budget: SearchBudget) -> (SearchOutcome, SearchStats) {
        let mut control = SearchControl::start(budget, CancellationToken::new());
        ExactSolver::new(model).solve(&mut control, &mut ProgressReporter::silent())
    }

    fn assert_hard_constraints(model: &ConstraintModel, roster: &Roster) {
        for day in 0..model.n_days() {
            assert!(roster.day_is_filled(model, day), "day {day} not filled");
            for staff in 0..model.n_staff() {
                if let Some(shift) = roster.shift_of(day, staff) {
                    assert!(!model.is_on_leave(staff, day, shift));
                }
            }
        }
        for staff in 0..model.n_staff() {
            let mut run = 0;
            let mut nights = 0;
            for day in 0..model.n_days() {
                match roster.shift_of(day, staff) {
                    Some(k) => {
                        run += 1;
                        nights = if model.is_night(k) { nights + 1 } else { 0 };
                        assert!(roster.hours_span_through(model, day, k, staff) <= model.max_span_minutes());
                    }
                    None => {
                        run = 0;
                        nights = 0;
                    }
                }
                assert!(run <= model.limits.max_consecutive_shifts);
                assert!(nights <= model.limits.max_night_shifts);
            }
        }
    }

    #[test]
    fn test_full_month_found() {
        let model = validate_request(&three_shifts(6)).unwrap();
        let (outcome, stats) = run(&model, SearchBudget::from_millis(10_000));
        let SearchOutcome::Found(roster) = outcome else {
            panic!("expected a roster");
        };
        assert_hard_constraints(&model, &roster);
        assert_eq!(roster.assignment_count(), 90);
        assert_eq!(stats.decision_points, 180);
        assert!(stats.nodes >= 180);
    }

    #[test]
    fn test_respects_leave() {
        let req = three_shifts(6)
            .with_leave(LeaveRequest::full_day("n1", d(1)))
            .with_leave(LeaveRequest::for_shift("n2", d(2), "evening"));
        let model = validate_request(&req).unwrap();
        let (outcome, _) = run(&model, SearchBudget::from_millis(10_000));
        let SearchOutcome::Found(roster) = outcome else {
            panic!("expected a roster");
        };
        assert!(!roster.is_working(0, 0));
        assert_ne!(roster.shift_of(1, 1), Some(1));
        assert_hard_constraints(&model, &roster);
    }

    #[test]
    fn test_deterministic() {
        let model = validate_request(&three_shifts(5)).unwrap();
        let (a, _) = run(&model, SearchBudget::from_millis(10_000));
        let (b, _) = run(&model, SearchBudget::from_millis(10_000));
        match (a, b) {
            (SearchOutcome::Found(a), SearchOutcome::Found(b)) => assert_eq!(a, b),
            _ => panic!("expected two rosters"),
        }
    }

    #[test]
    fn test_understaffed_day_exhausts_immediately() {
        let model = validate_request(&three_shifts(2)).unwrap();
        let (outcome, stats) = run(&model, SearchBudget::from_millis(10_000));
        assert!(matches!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustReason::SpaceExhausted
            }
        ));
        assert_eq!(stats.nodes, 0);
    }

    #[test]
    fn test_night_streak_exhausts() {
        // One nurse, nights required on days 1-3 only.
        let mut req = GenerationRequest::new("W", 2025, 4)
            .with_staff(StaffMember::nurse("n1"))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0));
        for day in 4..=30 {
            req = req.with_override(RequirementOverride::new(d(day), "night", 0, 0));
        }
        let model = validate_request(&req).unwrap();
        let (outcome, _) = run(&model, SearchBudget::from_millis(10_000));
        assert!(matches!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustReason::SpaceExhausted
            }
        ));
    }

    #[test]
    fn test_node_budget_stops_search() {
        let model = validate_request(&three_shifts(6)).unwrap();
        let (outcome, stats) = run(
            &model,
            SearchBudget::from_millis(10_000).with_node_limit(Some(10)),
        );
        assert!(matches!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustReason::NodeBudget
            }
        ));
        assert_eq!(stats.nodes, 10);
    }

    #[test]
    fn test_cancelled_before_start() {
        let model = validate_request(&three_shifts(6)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let mut control = SearchControl::start(SearchBudget::from_millis(10_000), token);
        let (outcome, _) =
            ExactSolver::new(&model).solve(&mut control, &mut ProgressReporter::silent());
        assert!(matches!(outcome, SearchOutcome::Cancelled { .. }));
    }

    #[test]
    fn test_progress_bounded_by_search_range() {
        let model = validate_request(&three_shifts(6)).unwrap();
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            let mut reporter = ProgressReporter::new(Some(&mut sink));
            let mut control =
                SearchControl::start(SearchBudget::from_millis(10_000), CancellationToken::new());
            let (outcome, _) = ExactSolver::new(&model).solve(&mut control, &mut reporter);
            assert!(outcome.is_found());
        }
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&SEARCH_PROGRESS_END));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}
