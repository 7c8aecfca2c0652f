//! Exact roster search.
//!
//! - [`ExactSolver`]: bounded depth-first backtracking over `(day, staff)`
//!   decision points
//! - [`SearchControl`]: time/node budgets and cooperative cancellation
//! - [`ProgressSink`]: coarse progress delivery

mod backtrack;
mod control;

pub use backtrack::{
    ExactSolver, ExhaustReason, SearchOutcome, SearchStats, SEARCH_PROGRESS_END,
};
pub use control::{ProgressReporter, ProgressSink, SearchBudget, SearchControl, StopReason};
