//! Engine error taxonomy.
//!
//! Only malformed input and explicit cancellation are errors. A search that
//! cannot certify an exact schedule is a normal outcome and is recovered by
//! the relaxation pass.

use thiserror::Error;

use crate::models::Schedule;
use crate::validation::ValidationError;

/// Errors returned by the generation entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Year or month cannot be expanded into a calendar month.
    #[error("invalid calendar input: year {year}, month {month}")]
    InvalidCalendarInput { year: i32, month: u32 },

    /// Staff, shift, leave, limit or override data failed validation.
    #[error("invalid constraint input: {}", summarize(.0))]
    InvalidConstraintInput(Vec<ValidationError>),

    /// The caller cancelled the run. `partial` holds whatever the engine had
    /// assembled when it stopped; it is not a complete schedule.
    #[error("schedule generation cancelled")]
    Cancelled { partial: Box<Schedule> },

    /// The blocking worker running the search did not complete.
    #[error("generation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// Validation errors carried by an `InvalidConstraintInput`, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            EngineError::InvalidConstraintInput(errors) => errors,
            _ => &[],
        }
    }

    /// Whether this error reports a caller cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled { .. })
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_constraint_error_display() {
        let err = EngineError::InvalidConstraintInput(vec![
            ValidationError::new(
                ValidationErrorKind::NegativeLimit,
                "constraints.maxNightShifts",
                "constraints",
                "limit must be non-negative, got -1",
            ),
            ValidationError::new(
                ValidationErrorKind::UnknownStaff,
                "leaveDates[0].staffId",
                "n9",
                "unknown staff id",
            ),
        ]);
        let text = err.to_string();
        assert!(text.contains("maxNightShifts"));
        assert!(text.contains("and 1 more"));
        assert_eq!(err.validation_errors().len(), 2);
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_calendar_error_display() {
        let err = EngineError::InvalidCalendarInput {
            year: 2025,
            month: 13,
        };
        assert_eq!(err.to_string(), "invalid calendar input: year 2025, month 13");
        assert!(err.validation_errors().is_empty());
    }
}
