//! Rostering domain models.
//!
//! Provides the data types for describing a ward's monthly rostering
//! problem and its solution.
//!
//! # Layers
//!
//! | Type | Role |
//! |------|------|
//! | [`GenerationRequest`] | Raw input as submitted |
//! | [`ConstraintModel`] | Validated, index-addressed problem |
//! | [`Schedule`] | Solution keyed by date and shift name |

mod calendar;
mod constraint;
mod leave;
mod problem;
mod request;
mod schedule;
mod shift;
mod staff;

pub use calendar::{date_key, days_in_month, MonthCalendar, MAX_YEAR, MIN_YEAR};
pub use constraint::{ConstraintKind, ConstraintLimits, PriorityOrder};
pub use leave::LeaveRequest;
pub use problem::{ConstraintModel, DayLeave};
pub use request::{
    GenerationRequest, LimitsInput, RequirementInput, RequirementOverride, ShiftInput,
};
pub use schedule::{Assignment, Schedule, Violation, ViolationType};
pub use shift::{parse_time_of_day, ShiftDefinition, StaffRequirement, MINUTES_PER_DAY};
pub use staff::{Role, StaffMember};
