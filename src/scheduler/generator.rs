//! Schedule generation entry points.
//!
//! Runs the whole pipeline for one request: validation, exact search, and
//! relaxation when the search cannot certify a roster. The result is
//! packaged with a status telling the caller whether every hard constraint
//! holds (`EXACT`) or the roster is best-effort (`RELAXED`).

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::audit;
use crate::error::EngineError;
use crate::models::{Assignment, ConstraintModel, GenerationRequest, Schedule};
use crate::repair::{relax, RelaxOutcome, RelaxationReport};
use crate::roster::Roster;
use crate::solver::{
    ExactSolver, ExhaustReason, ProgressReporter, ProgressSink, SearchBudget, SearchControl,
    SearchOutcome, SearchStats,
};
use crate::validation::validate_request;

/// Default exact-search budget: 30 seconds.
pub const DEFAULT_TIME_BUDGET_MS: u64 = 30_000;

/// Generator configuration.
///
/// Per-request `timeBudgetMs` and `nodeBudget` take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    /// Exact-search time budget in milliseconds.
    pub time_budget_ms: u64,
    /// Exact-search node budget.
    pub node_budget: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: DEFAULT_TIME_BUDGET_MS,
            node_budget: None,
        }
    }
}

impl GeneratorConfig {
    /// Sets the time budget.
    pub fn with_time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = ms;
        self
    }

    /// Sets the node budget.
    pub fn with_node_budget(mut self, nodes: u64) -> Self {
        self.node_budget = Some(nodes);
        self
    }

    /// Budget for a request, applying its overrides.
    pub fn budget_for(&self, request: &GenerationRequest) -> SearchBudget {
        SearchBudget::from_millis(request.time_budget_ms.unwrap_or(self.time_budget_ms))
            .with_node_limit(request.node_budget.or(self.node_budget))
    }
}

/// Whether the roster satisfies every hard constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    /// Found by the exact search.
    Exact,
    /// Built by the relaxation pass; may carry violations.
    Relaxed,
}

impl GenerationStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Exact => "EXACT",
            GenerationStatus::Relaxed => "RELAXED",
        }
    }
}

/// Counters describing how a schedule was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    /// Exact-search counters.
    pub search: SearchStats,
    /// Why the exact search gave up, for relaxed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhaust_reason: Option<ExhaustReason>,
    /// Relaxation counters, for relaxed results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relaxation: Option<RelaxationReport>,
    /// Wall-clock time of the whole run.
    pub elapsed_ms: u64,
}

/// A generated schedule with its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub status: GenerationStatus,
    /// The roster; `schedule.violations` lists what the audit found.
    pub schedule: Schedule,
    pub stats: GenerationStats,
}

impl GenerationOutcome {
    /// Whether every hard constraint holds.
    pub fn is_exact(&self) -> bool {
        self.status == GenerationStatus::Exact
    }

    /// Flat `(staff, date, shift)` form of the schedule.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.schedule.to_assignments()
    }
}

/// Cancellation and progress wiring for one run.
#[derive(Default)]
pub struct GenerationHooks<'a> {
    /// Checked at every decision point and between relaxation rules.
    pub cancel: CancellationToken,
    /// Receives monotonic progress percentages.
    pub progress: Option<&'a mut dyn ProgressSink>,
}

impl<'a> GenerationHooks<'a> {
    /// Uses a caller-owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attaches a progress sink.
    pub fn with_progress(mut self, sink: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Generates monthly rosters.
///
/// # Example
/// ```
/// use u_roster::models::{GenerationRequest, ShiftInput, StaffMember};
/// use u_roster::scheduler::{GenerationStatus, ScheduleGenerator};
///
/// let request = GenerationRequest::new("ward-a", 2025, 4)
///     .with_staff(StaffMember::nurse("n1"))
///     .with_staff(StaffMember::nurse("n2"))
///     .with_shift(ShiftInput::new("day", "08:00", "16:00", 1, 0));
///
/// let outcome = ScheduleGenerator::default().generate(&request).unwrap();
/// assert_eq!(outcome.status, GenerationStatus::Exact);
/// assert_eq!(outcome.assignments().len(), 30);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator {
    config: GeneratorConfig,
}

impl ScheduleGenerator {
    /// Creates a generator.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a schedule, blocking the calling thread.
    ///
    /// # Errors
    /// `InvalidCalendarInput` or `InvalidConstraintInput` for malformed
    /// requests.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, EngineError> {
        self.generate_with(request, GenerationHooks::default())
    }

    /// Generates a schedule with cancellation and progress reporting.
    ///
    /// # Errors
    /// As [`ScheduleGenerator::generate`], plus `Cancelled` when the token
    /// fires before the schedule is complete.
    pub fn generate_with(
        &self,
        request: &GenerationRequest,
        hooks: GenerationHooks<'_>,
    ) -> Result<GenerationOutcome, EngineError> {
        info!(
            ward = %request.ward_id,
            year = request.year,
            month = request.month,
            staff = request.staff_list.len(),
            shifts = request.shift_definitions.len(),
            "schedule generation started"
        );
        let model = validate_request(request)?;
        self.generate_model(&model, self.config.budget_for(request), hooks)
    }

    /// Generates a schedule for an already-validated model.
    ///
    /// # Errors
    /// `Cancelled` when the token fires before the schedule is complete.
    pub fn generate_model(
        &self,
        model: &ConstraintModel,
        budget: SearchBudget,
        hooks: GenerationHooks<'_>,
    ) -> Result<GenerationOutcome, EngineError> {
        let started = Instant::now();
        let GenerationHooks { cancel, progress } = hooks;
        let mut reporter = ProgressReporter::new(progress);
        let mut control = SearchControl::start(budget, cancel.clone());

        let (outcome, search) = ExactSolver::new(model).solve(&mut control, &mut reporter);
        let mut stats = GenerationStats {
            search,
            ..GenerationStats::default()
        };

        let (status, roster) = match outcome {
            SearchOutcome::Found(roster) => (GenerationStatus::Exact, roster),
            SearchOutcome::Cancelled { partial } => return Err(cancelled(model, &partial)),
            SearchOutcome::Exhausted { reason } => {
                warn!(
                    ward = %model.ward_id,
                    ?reason,
                    nodes = search.nodes,
                    "exact search exhausted, relaxing constraints"
                );
                stats.exhaust_reason = Some(reason);
                match relax(model, &cancel, &mut reporter) {
                    RelaxOutcome::Completed { roster, report } => {
                        stats.relaxation = Some(report);
                        (GenerationStatus::Relaxed, roster)
                    }
                    RelaxOutcome::Cancelled { partial } => return Err(cancelled(model, &partial)),
                }
            }
        };

        let mut schedule = roster.to_schedule(model);
        schedule.violations = audit(&roster, model);
        debug!(violations = schedule.violations.len(), "audit complete");

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        reporter.report(100);
        info!(
            ward = %model.ward_id,
            status = status.as_str(),
            assignments = schedule.assignment_count(),
            violations = schedule.violations.len(),
            elapsed_ms = stats.elapsed_ms,
            "schedule generation finished"
        );

        Ok(GenerationOutcome {
            status,
            schedule,
            stats,
        })
    }

    /// Generates a schedule on tokio's blocking pool.
    ///
    /// # Errors
    /// As [`ScheduleGenerator::generate_with`], plus `Worker` if the
    /// blocking task panics or is aborted.
    pub async fn generate_async(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
        progress: Option<Box<dyn ProgressSink>>,
    ) -> Result<GenerationOutcome, EngineError> {
        let generator = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut progress = progress;
            let mut hooks = GenerationHooks::default().with_cancel(cancel);
            if let Some(sink) = progress.as_mut() {
                hooks = hooks.with_progress(sink.as_mut());
            }
            generator.generate_with(&request, hooks)
        })
        .await?
    }
}

fn cancelled(model: &ConstraintModel, partial: &Roster) -> EngineError {
    info!(ward = %model.ward_id, "schedule generation cancelled");
    EngineError::Cancelled {
        partial: Box::new(partial.to_schedule(model)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintLimits, LeaveRequest, RequirementOverride, ShiftInput, StaffMember,
        ViolationType,
    };
    use chrono::NaiveDate;
    use std::time::Duration;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    /// Three one-nurse shifts, staffed on the first day only.
    fn first_day_only(nurses: &[&str]) -> GenerationRequest {
        let mut req = GenerationRequest::new("W1", 2025, 4)
            .with_shift(ShiftInput::new("morning", "07:00", "15:00", 1, 0))
            .with_shift(ShiftInput::new("evening", "15:00", "23:00", 1, 0))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0))
            .with_time_budget_ms(5_000);
        for id in nurses {
            req = req.with_staff(StaffMember::nurse(*id));
        }
        for day in 2..=30 {
            for shift in ["morning", "evening", "night"] {
                req = req.with_override(RequirementOverride::new(d(day), shift, 0, 0));
            }
        }
        req
    }

    fn full_month(nurses: usize) -> GenerationRequest {
        let mut req = GenerationRequest::new("W1", 2025, 4)
            .with_shift(ShiftInput::new("morning", "07:00", "15:00", 1, 0))
            .with_shift(ShiftInput::new("evening", "15:00", "23:00", 1, 0))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0))
            .with_time_budget_ms(5_000);
        for i in 1..=nurses {
            req = req.with_staff(StaffMember::nurse(format!("n{i}")));
        }
        req
    }

    fn assert_no_double_booking(schedule: &Schedule) {
        for (date, cells) in &schedule.days {
            let mut ids: Vec<&String> = cells.values().flatten().collect();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before, "double booking on {date}");
        }
    }

    #[test]
    fn test_three_staff_fill_three_shifts() {
        let outcome = ScheduleGenerator::default()
            .generate(&first_day_only(&["n1", "n2", "n3"]))
            .unwrap();
        assert_eq!(outcome.status, GenerationStatus::Exact);
        assert!(outcome.schedule.is_valid());

        let mut ids: Vec<String> = ["morning", "evening", "night"]
            .iter()
            .flat_map(|s| outcome.schedule.staff_on(d(1), s).to_vec())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert_eq!(outcome.assignments().len(), 3);
    }

    #[test]
    fn test_leave_leaves_one_cell_short() {
        let req = first_day_only(&["n1", "n2", "n3"]).with_leave(LeaveRequest::full_day("n3", d(1)));
        let outcome = ScheduleGenerator::default().generate(&req).unwrap();

        assert_eq!(outcome.status, GenerationStatus::Relaxed);
        assert_eq!(
            outcome.stats.exhaust_reason,
            Some(ExhaustReason::SpaceExhausted)
        );
        assert!(outcome.schedule.shifts_for("n3", d(1)).is_empty());
        assert_no_double_booking(&outcome.schedule);

        let violations = &outcome.schedule.violations;
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].violation_type, ViolationType::Understaffed);
        assert_eq!(violations[0].date, Some(d(1)));
        assert_eq!(outcome.assignments().len(), 2);
    }

    #[test]
    fn test_third_night_removed() {
        let mut req = GenerationRequest::new("W1", 2025, 4)
            .with_staff(StaffMember::nurse("n1"))
            .with_shift(ShiftInput::new("night", "23:00", "07:00", 1, 0))
            .with_limits(ConstraintLimits {
                max_night_shifts: 2,
                ..ConstraintLimits::default()
            });
        for day in 4..=30 {
            req = req.with_override(RequirementOverride::new(d(day), "night", 0, 0));
        }
        let outcome = ScheduleGenerator::default().generate(&req).unwrap();

        assert_eq!(outcome.status, GenerationStatus::Relaxed);
        assert_eq!(outcome.schedule.staff_on(d(1), "night"), &["n1".to_string()]);
        assert_eq!(outcome.schedule.staff_on(d(2), "night"), &["n1".to_string()]);
        assert!(outcome.schedule.staff_on(d(3), "night").is_empty());

        let violations = &outcome.schedule.violations;
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].violation_type, ViolationType::Understaffed);
        assert_eq!(violations[0].date, Some(d(3)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();
        let err = ScheduleGenerator::default()
            .generate_with(&full_month(6), GenerationHooks::default().with_cancel(token))
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(1));
        let EngineError::Cancelled { partial } = err else {
            unreachable!();
        };
        assert_eq!(partial.days.len(), 30);
    }

    #[test]
    fn test_full_month_exact() {
        let outcome = ScheduleGenerator::default().generate(&full_month(6)).unwrap();
        assert_eq!(outcome.status, GenerationStatus::Exact);
        assert_eq!(outcome.assignments().len(), 90);
        assert_no_double_booking(&outcome.schedule);
        for cells in outcome.schedule.days.values() {
            assert!(cells.values().all(|ids| ids.len() == 1));
        }
        assert!(outcome
            .schedule
            .violations
            .iter()
            .all(|v| matches!(
                v.violation_type,
                ViolationType::ShiftSpread | ViolationType::ShiftTypeSpread
            )));
    }

    #[test]
    fn test_exact_roster_can_exceed_spread() {
        // Three cells for four nurses: one always sits out.
        let req = first_day_only(&["n1", "n2", "n3", "n4"]).with_limits(ConstraintLimits {
            max_shift_diff: 0,
            ..ConstraintLimits::default()
        });
        let outcome = ScheduleGenerator::default().generate(&req).unwrap();
        assert_eq!(outcome.status, GenerationStatus::Exact);
        assert_eq!(outcome.assignments().len(), 3);
        let violations = &outcome.schedule.violations;
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].violation_type, ViolationType::ShiftSpread);
    }

    #[test]
    fn test_deterministic_output() {
        let generator = ScheduleGenerator::default();
        let a = generator.generate(&full_month(6)).unwrap();
        let b = generator.generate(&full_month(6)).unwrap();
        assert_eq!(
            serde_json::to_string(&a.schedule).unwrap(),
            serde_json::to_string(&b.schedule).unwrap()
        );
    }

    #[test]
    fn test_relaxed_shape_is_complete() {
        // Two nurses cannot staff three shifts a day.
        let outcome = ScheduleGenerator::default().generate(&full_month(2)).unwrap();
        assert_eq!(outcome.status, GenerationStatus::Relaxed);
        assert_eq!(outcome.schedule.days.len(), 30);
        for cells in outcome.schedule.days.values() {
            assert_eq!(cells.len(), 3);
        }
        assert_no_double_booking(&outcome.schedule);
        assert!(outcome.stats.relaxation.is_some());
    }

    #[test]
    fn test_time_budget_falls_back_to_relaxation() {
        let req = full_month(6).with_time_budget_ms(0);
        let outcome = ScheduleGenerator::default().generate(&req).unwrap();
        assert_eq!(outcome.status, GenerationStatus::Relaxed);
        assert_eq!(outcome.stats.exhaust_reason, Some(ExhaustReason::TimeBudget));
        assert_no_double_booking(&outcome.schedule);
    }

    #[test]
    fn test_node_budget_from_config() {
        let generator = ScheduleGenerator::new(GeneratorConfig::default().with_node_budget(5));
        let mut req = full_month(6);
        req.time_budget_ms = None;
        let outcome = generator.generate(&req).unwrap();
        assert_eq!(outcome.stats.exhaust_reason, Some(ExhaustReason::NodeBudget));
        assert_eq!(outcome.stats.search.nodes, 5);
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let mut req = full_month(3);
        req.month = 0;
        assert!(matches!(
            ScheduleGenerator::default().generate(&req),
            Err(EngineError::InvalidCalendarInput { .. })
        ));

        let req = full_month(3).with_leave(LeaveRequest::full_day("ghost", d(1)));
        let err = ScheduleGenerator::default().generate(&req).unwrap_err();
        assert_eq!(err.validation_errors().len(), 1);
    }

    #[test]
    fn test_huge_requirements_do_not_overflow() {
        let huge = i64::from(u32::MAX);
        let req = GenerationRequest::new("W1", 2025, 4)
            .with_staff(StaffMember::nurse("n1"))
            .with_staff(StaffMember::nurse("n2"))
            .with_shift(ShiftInput::new("day", "07:00", "19:00", huge, 0))
            .with_shift(ShiftInput::new("night", "19:00", "07:00", huge, 0))
            .with_time_budget_ms(5_000);
        let outcome = ScheduleGenerator::default().generate(&req).unwrap();
        assert_eq!(outcome.status, GenerationStatus::Relaxed);
        assert_eq!(outcome.stats.exhaust_reason, Some(ExhaustReason::SpaceExhausted));
        assert!(!outcome.assignments().is_empty());
        assert!(outcome.assignments().len() <= 60);
        assert_no_double_booking(&outcome.schedule);
    }

    #[test]
    fn test_progress_reaches_100() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            let hooks = GenerationHooks::default().with_progress(&mut sink);
            ScheduleGenerator::default()
                .generate_with(&full_month(2), hooks)
                .unwrap();
        }
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = ScheduleGenerator::default()
            .generate(&first_day_only(&["n1", "n2", "n3"]))
            .unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "EXACT");
        assert_eq!(value["schedule"]["days"]["2025-04-01"]["morning"][0], "n1");
        assert!(value["stats"]["search"]["nodes"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_config_from_json() {
        let config: GeneratorConfig = serde_json::from_str(r#"{"nodeBudget": 100}"#).unwrap();
        assert_eq!(config.time_budget_ms, DEFAULT_TIME_BUDGET_MS);
        assert_eq!(config.node_budget, Some(100));
    }

    #[tokio::test]
    async fn test_generate_async() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<u8>();
        let outcome = ScheduleGenerator::default()
            .generate_async(full_month(6), CancellationToken::new(), Some(Box::new(tx)))
            .await
            .unwrap();
        assert!(outcome.is_exact());

        let mut last = None;
        while let Ok(p) = rx.try_recv() {
            last = Some(p);
        }
        assert_eq!(last, Some(100));
    }
}
