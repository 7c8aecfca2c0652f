//! Monthly shift rostering for hospital wards.
//!
//! Builds a month of shift assignments for a ward's nurses and nursing
//! assistants from staffing requirements, leave requests and working-time
//! limits. A bounded exact search looks for a roster satisfying every hard
//! constraint; when none is found within budget, a relaxation pass repairs a
//! best-effort roster in a caller-chosen priority order and reports what it
//! could not satisfy.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `StaffMember`, `ShiftDefinition`,
//!   `LeaveRequest`, `GenerationRequest`, `ConstraintModel`, `Schedule`
//! - **`validation`**: Input integrity checks (calendar, shifts, staff, leave)
//! - **`roster`**: Index-addressed working roster shared by every phase
//! - **`solver`**: Exact backtracking search with budgets and cancellation
//! - **`repair`**: Priority-ordered relaxation rules
//! - **`audit`**: Violation reporting on finished or edited schedules
//! - **`scheduler`**: Generation entry points, background jobs and KPIs
//!
//! # Example
//!
//! ```
//! use u_roster::{GenerationRequest, ScheduleGenerator, ShiftInput, StaffMember};
//!
//! let request = GenerationRequest::new("ward-a", 2025, 2)
//!     .with_staff(StaffMember::nurse("n1"))
//!     .with_staff(StaffMember::nurse("n2"))
//!     .with_staff(StaffMember::nurse("n3"))
//!     .with_shift(ShiftInput::new("day", "07:00", "19:00", 1, 0))
//!     .with_shift(ShiftInput::new("night", "19:00", "07:00", 1, 0));
//!
//! let outcome = ScheduleGenerator::default().generate(&request)?;
//! println!("{}: {} assignments", outcome.status.as_str(), outcome.assignments().len());
//! # Ok::<(), u_roster::EngineError>(())
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming", Ch. 4

pub mod audit;
pub mod error;
pub mod models;
pub mod repair;
pub mod roster;
pub mod scheduler;
pub mod solver;
pub mod validation;

pub use error::EngineError;
pub use models::{
    Assignment, GenerationRequest, LeaveRequest, RequirementOverride, Role, Schedule,
    ShiftInput, StaffMember, Violation, ViolationType,
};
pub use scheduler::{
    GenerationJob, GenerationOutcome, GenerationStatus, GeneratorConfig, ScheduleGenerator,
    ScheduleKpi,
};
pub use validation::validate_request;
