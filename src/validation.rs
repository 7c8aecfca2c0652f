//! Input validation for rostering requests.
//!
//! Checks the structural integrity of a [`GenerationRequest`] and turns it
//! into a [`ConstraintModel`]. Detects:
//! - Invalid calendar month
//! - Empty, duplicate or unparseable shift definitions
//! - Missing or negative staffing requirements
//! - Negative limits
//! - Empty or duplicate staff ids
//! - Leave and overrides referencing unknown staff, shifts or dates
//!
//! Every problem is collected before reporting, so one round trip shows the
//! caller everything that is wrong with a request.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::EngineError;
use crate::models::{
    parse_time_of_day, ConstraintLimits, ConstraintModel, DayLeave, GenerationRequest,
    LimitsInput, MonthCalendar, PriorityOrder, RequirementInput, ShiftDefinition,
    StaffRequirement,
};

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Offending field, e.g. `shiftDefinitions[1].start`.
    pub field: String,
    /// Offending record: a shift name, staff id or section name.
    pub record: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// No shift definitions at all.
    EmptyShiftList,
    /// A shift has a blank name.
    EmptyShiftName,
    /// Two shifts share a name.
    DuplicateShiftName,
    /// A start or end time cannot be parsed.
    InvalidShiftTime,
    /// A shift has no staffing requirement.
    MissingRequirement,
    /// A staffing count is negative.
    NegativeRequirement,
    /// A numeric limit is negative.
    NegativeLimit,
    /// A number does not fit the engine's counters.
    ValueOutOfRange,
    /// A staff member has a blank id.
    EmptyStaffId,
    /// Two staff members share an id.
    DuplicateId,
    /// A reference to a staff id that is not on the roster.
    UnknownStaff,
    /// A date that is not in the requested month.
    DateOutsideMonth,
    /// A reference to a shift name that is not defined.
    UnknownShift,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        record: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            record: record.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.record, self.message)
    }
}

/// Validates a request and builds its constraint model.
///
/// Checks, in order:
/// 1. The year and month expand to a calendar month
/// 2. At least one shift; names non-blank and unique; times parse
/// 3. Every shift has a non-negative staffing requirement
/// 4. Limits are non-negative (omitted limits take their defaults)
/// 5. Staff ids are non-blank and unique
/// 6. Leave references known staff, dates in the month and known shifts
/// 7. Requirement overrides reference known shifts and dates in the month
///
/// # Errors
/// `InvalidCalendarInput` if step 1 fails, otherwise
/// `InvalidConstraintInput` with every problem found in steps 2-7.
pub fn validate_request(request: &GenerationRequest) -> Result<ConstraintModel, EngineError> {
    let calendar = MonthCalendar::new(request.year, request.month)?;
    let mut errors = Vec::new();

    let shifts = validate_shifts(request, &mut errors);
    let limits = validate_limits(&request.constraints, &mut errors);

    // Staff ids
    let mut staff_ids = HashSet::new();
    for (i, s) in request.staff_list.iter().enumerate() {
        if s.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyStaffId,
                format!("staffList[{i}].id"),
                format!("staffList[{i}]"),
                "staff id must not be empty",
            ));
        } else if !staff_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("staffList[{i}].id"),
                s.id.clone(),
                format!("duplicate staff id: {}", s.id),
            ));
        }
    }

    let n_days = calendar.len();
    let n_staff = request.staff_list.len();
    let n_shifts = shifts.len();
    let shift_index = |name: &str| shifts.iter().position(|s| s.name == name);
    // Names of shifts rejected above are not reported again as unknown.
    let declared = |name: &str| request.shift_definitions.iter().any(|s| s.name == name);

    // Leave
    let mut day_leave: Vec<Option<DayLeave>> = vec![None; n_days * n_staff];
    for (i, leave) in request.leave_dates.iter().enumerate() {
        let staff = request.staff_list.iter().position(|s| s.id == leave.staff_id);
        if staff.is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStaff,
                format!("leaveDates[{i}].staffId"),
                leave.staff_id.clone(),
                format!("leave references unknown staff id: {}", leave.staff_id),
            ));
        }
        let day = calendar.day_index(leave.date);
        if day.is_none() {
            errors.push(date_outside_month(
                format!("leaveDates[{i}].date"),
                &leave.staff_id,
                leave.date,
                &calendar,
            ));
        }
        let shift = match &leave.shift {
            Some(name) => match shift_index(name) {
                Some(k) => Some(k),
                None => {
                    if !declared(name) {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::UnknownShift,
                            format!("leaveDates[{i}].shift"),
                            leave.staff_id.clone(),
                            format!("leave references unknown shift: {name}"),
                        ));
                    }
                    continue;
                }
            },
            None => None,
        };
        if let (Some(staff), Some(day)) = (staff, day) {
            let entry = day_leave[day * n_staff + staff].get_or_insert_with(DayLeave::default);
            match shift {
                None => entry.full_day = true,
                Some(k) if !entry.shifts.contains(&k) => entry.shifts.push(k),
                Some(_) => {}
            }
        }
    }

    // Requirements, with per-date overrides
    let mut requirements: Vec<StaffRequirement> = (0..n_days)
        .flat_map(|_| shifts.iter().map(|s| s.required_staff))
        .collect();
    for (i, o) in request.requirement_overrides.iter().enumerate() {
        let shift = shift_index(&o.shift);
        if shift.is_none() && !declared(&o.shift) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownShift,
                format!("requirementOverrides[{i}].shift"),
                o.shift.clone(),
                format!("override references unknown shift: {}", o.shift),
            ));
        }
        let day = calendar.day_index(o.date);
        if day.is_none() {
            errors.push(date_outside_month(
                format!("requirementOverrides[{i}].date"),
                &o.shift,
                o.date,
                &calendar,
            ));
        }
        let field = format!("requirementOverrides[{i}]");
        let nurse = count(o.nurse, &format!("{field}.nurse"), &o.shift, &mut errors);
        let assistant = count(o.assistant, &format!("{field}.assistant"), &o.shift, &mut errors);
        if let (Some(k), Some(day), Some(nurse), Some(assistant)) = (shift, day, nurse, assistant)
        {
            requirements[day * n_shifts + k] = StaffRequirement::new(nurse, assistant);
        }
    }

    if !errors.is_empty() {
        return Err(EngineError::InvalidConstraintInput(errors));
    }

    let mut traversal: Vec<usize> = (0..n_staff).collect();
    if let Some(seed) = request.rotation_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        traversal.shuffle(&mut rng);
    }

    Ok(ConstraintModel::from_parts(
        request.ward_id.clone(),
        calendar,
        request.staff_list.clone(),
        designate_night(shifts),
        request.leave_dates.clone(),
        limits,
        PriorityOrder::normalize(&request.priority),
        traversal,
        requirements,
        day_leave,
    ))
}

/// Validates shift definitions and returns those that parsed.
fn validate_shifts(
    request: &GenerationRequest,
    errors: &mut Vec<ValidationError>,
) -> Vec<ShiftDefinition> {
    if request.shift_definitions.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyShiftList,
            "shiftDefinitions",
            "shiftDefinitions",
            "at least one shift must be defined",
        ));
        return Vec::new();
    }

    let mut names = HashSet::new();
    let mut shifts = Vec::with_capacity(request.shift_definitions.len());
    for (i, input) in request.shift_definitions.iter().enumerate() {
        let field = format!("shiftDefinitions[{i}]");
        let record = if input.name.trim().is_empty() {
            field.clone()
        } else {
            input.name.clone()
        };

        if input.name.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyShiftName,
                format!("{field}.name"),
                record.clone(),
                "shift name must not be empty",
            ));
        } else if !names.insert(input.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateShiftName,
                format!("{field}.name"),
                record.clone(),
                format!("duplicate shift name: {}", input.name),
            ));
        }

        let start = parse_time_of_day(&input.start);
        if start.is_none() {
            errors.push(invalid_time(&field, "start", &record, &input.start));
        }
        let end = parse_time_of_day(&input.end);
        if end.is_none() {
            errors.push(invalid_time(&field, "end", &record, &input.end));
        }

        let required = requirement(input.required_staff, &field, &record, errors);

        if let (Some(start), Some(end), Some(required)) = (start, end, required) {
            let mut shift = ShiftDefinition::new(input.name.clone(), start, end, required);
            if let Some(night) = input.night {
                shift = shift.with_night(night);
            }
            shifts.push(shift);
        }
    }
    shifts
}

fn requirement(
    input: Option<RequirementInput>,
    field: &str,
    record: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<StaffRequirement> {
    let input = match input {
        Some(r) if r.nurse.is_some() || r.assistant.is_some() => r,
        _ => {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingRequirement,
                format!("{field}.requiredStaff"),
                record,
                "shift has no staffing requirement",
            ));
            return None;
        }
    };
    let nurse = count(
        input.nurse.unwrap_or(0),
        &format!("{field}.requiredStaff.nurse"),
        record,
        errors,
    );
    let assistant = count(
        input.assistant.unwrap_or(0),
        &format!("{field}.requiredStaff.assistant"),
        record,
        errors,
    );
    Some(StaffRequirement::new(nurse?, assistant?))
}

fn count(value: i64, field: &str, record: &str, errors: &mut Vec<ValidationError>) -> Option<u32> {
    if value < 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::NegativeRequirement,
            field,
            record,
            format!("staffing count must be non-negative, got {value}"),
        ));
        return None;
    }
    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::new(
                ValidationErrorKind::ValueOutOfRange,
                field,
                record,
                format!("staffing count too large: {value}"),
            ));
            None
        }
    }
}

fn validate_limits(input: &LimitsInput, errors: &mut Vec<ValidationError>) -> ConstraintLimits {
    let defaults = ConstraintLimits::default();
    let mut limit = |value: Option<i64>, name: &str, default: u32| -> u32 {
        let Some(value) = value else {
            return default;
        };
        if value < 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeLimit,
                format!("constraints.{name}"),
                "constraints",
                format!("limit must be non-negative, got {value}"),
            ));
            return default;
        }
        u32::try_from(value).unwrap_or_else(|_| {
            errors.push(ValidationError::new(
                ValidationErrorKind::ValueOutOfRange,
                format!("constraints.{name}"),
                "constraints",
                format!("limit too large: {value}"),
            ));
            default
        })
    };

    ConstraintLimits {
        max_consecutive_shifts: limit(
            input.max_consecutive_shifts,
            "maxConsecutiveShifts",
            defaults.max_consecutive_shifts,
        ),
        max_night_shifts: limit(
            input.max_night_shifts,
            "maxNightShifts",
            defaults.max_night_shifts,
        ),
        max_consecutive_working_hours: limit(
            input.max_consecutive_working_hours,
            "maxConsecutiveWorkingHours",
            defaults.max_consecutive_working_hours,
        ),
        max_shift_diff: limit(input.max_shift_diff, "maxShiftDiff", defaults.max_shift_diff),
        max_shift_diff_per_type: limit(
            input.max_shift_diff_per_type,
            "maxShiftDiffPerType",
            defaults.max_shift_diff_per_type,
        ),
    }
}

/// Resolves which shifts count toward night streaks.
///
/// Explicit flags win. Without any, shifts crossing midnight are night; if
/// none crosses midnight, the last shift is.
fn designate_night(mut shifts: Vec<ShiftDefinition>) -> Vec<ShiftDefinition> {
    if shifts.iter().any(|s| s.night) {
        return shifts;
    }
    let mut any = false;
    for s in shifts.iter_mut().filter(|s| s.crosses_midnight()) {
        s.night = true;
        any = true;
    }
    if !any {
        if let Some(last) = shifts.last_mut() {
            last.night = true;
        }
    }
    shifts
}

fn invalid_time(field: &str, which: &str, record: &str, text: &str) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::InvalidShiftTime,
        format!("{field}.{which}"),
        record,
        format!("cannot parse time of day: {text:?}"),
    )
}

fn date_outside_month(
    field: String,
    record: &str,
    date: NaiveDate,
    calendar: &MonthCalendar,
) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::DateOutsideMonth,
        field,
        record,
        format!(
            "date {date} is outside {:04}-{:02}",
            calendar.year, calendar.month
        ),
    )
}
