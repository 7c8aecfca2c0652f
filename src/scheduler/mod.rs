//! Roster generation and KPI evaluation.
//!
//! # Pipeline
//!
//! `ScheduleGenerator` validates a request, runs the exact backtracking
//! search within its budget and, when the search cannot certify a roster,
//! falls back to the priority-ordered relaxation pass. Every result is
//! audited and tagged `EXACT` or `RELAXED`.
//!
//! `GenerationJob` runs the same pipeline on tokio's blocking pool with a
//! cancellation token and a progress channel.
//!
//! # KPI
//!
//! `ScheduleKpi` computes staffing coverage, workload distribution and
//! streak metrics for a finished schedule.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

mod generator;
mod job;
mod kpi;

pub use generator::{
    GenerationHooks, GenerationOutcome, GenerationStats, GenerationStatus, GeneratorConfig,
    ScheduleGenerator, DEFAULT_TIME_BUDGET_MS,
};
pub use job::GenerationJob;
pub use kpi::ScheduleKpi;
