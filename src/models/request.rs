//! Raw generation request.
//!
//! This is the bundle the scheduling service hands to the engine, exactly as
//! it arrives: numbers are signed and optional so that malformed input can be
//! reported field by field instead of failing to deserialize. Use
//! [`crate::validation::validate_request`] to turn it into a
//! [`super::ConstraintModel`].

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::{ConstraintKind, ConstraintLimits, LeaveRequest, StaffMember};

/// Legacy priority entry with no constraint behind it; accepted and dropped.
const SHIFT_RULES: &str = "shift_rules";

/// Names accepted in `priority`.
const PRIORITY_NAMES: &[&str] = &[
    "userOffDays",
    "maxConsecutiveShifts",
    "maxNightShifts",
    "maxConsecutiveWorkingHours",
    "maxShiftDiff",
    "maxShiftDiffPerType",
    "leave_dates",
    "consecutive_shifts",
    "consecutive_night_shifts",
    SHIFT_RULES,
];

/// Everything needed to generate one ward's roster for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Ward being rostered.
    pub ward_id: String,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Ward staff, in traversal order.
    #[serde(default)]
    pub staff_list: Vec<StaffMember>,
    /// Requested leave.
    #[serde(default)]
    pub leave_dates: Vec<LeaveRequest>,
    /// Shift configuration, in definition order.
    #[serde(default)]
    pub shift_definitions: Vec<ShiftInput>,
    /// Numeric limits; omitted fields take their defaults.
    #[serde(default)]
    pub constraints: LimitsInput,
    /// Relaxation priority; normalized during validation.
    #[serde(default, deserialize_with = "priority_kinds")]
    pub priority: Vec<ConstraintKind>,
    /// Wall-clock budget for the exact search, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
    /// Decision-point budget for the exact search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_budget: Option<u64>,
    /// Per-date staffing overrides.
    #[serde(default)]
    pub requirement_overrides: Vec<RequirementOverride>,
    /// Seed for rotating the staff traversal order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_seed: Option<u64>,
}

/// Reads `priority`, dropping `shift_rules` entries.
fn priority_kinds<'de, D>(deserializer: D) -> Result<Vec<ConstraintKind>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Kind(ConstraintKind),
        Name(String),
    }

    let entries = Vec::<Entry>::deserialize(deserializer)?;
    let mut kinds = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Entry::Kind(kind) => kinds.push(kind),
            Entry::Name(name) if name == SHIFT_RULES => {
                debug!("ignoring legacy priority entry {SHIFT_RULES}");
            }
            Entry::Name(name) => return Err(de::Error::unknown_variant(&name, PRIORITY_NAMES)),
        }
    }
    Ok(kinds)
}

/// A shift definition as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftInput {
    pub name: String,
    /// `HH:MM` or `HH:MM:SS`.
    pub start: String,
    /// `HH:MM` or `HH:MM:SS`.
    pub end: String,
    #[serde(default)]
    pub required_staff: Option<RequirementInput>,
    /// Explicit night designation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night: Option<bool>,
}

/// Per-role headcount as configured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RequirementInput {
    #[serde(default)]
    pub nurse: Option<i64>,
    #[serde(default)]
    pub assistant: Option<i64>,
}

/// Numeric limits as configured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsInput {
    #[serde(default)]
    pub max_consecutive_shifts: Option<i64>,
    #[serde(default)]
    pub max_night_shifts: Option<i64>,
    #[serde(default)]
    pub max_consecutive_working_hours: Option<i64>,
    #[serde(default)]
    pub max_shift_diff: Option<i64>,
    #[serde(default)]
    pub max_shift_diff_per_type: Option<i64>,
}

/// Replaces one shift's requirement on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementOverride {
    pub date: NaiveDate,
    pub shift: String,
    #[serde(default)]
    pub nurse: i64,
    #[serde(default)]
    pub assistant: i64,
}

impl GenerationRequest {
    /// Creates an empty request for a ward and month.
    pub fn new(ward_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            ward_id: ward_id.into(),
            year,
            month,
            staff_list: Vec::new(),
            leave_dates: Vec::new(),
            shift_definitions: Vec::new(),
            constraints: LimitsInput::default(),
            priority: Vec::new(),
            time_budget_ms: None,
            node_budget: None,
            requirement_overrides: Vec::new(),
            rotation_seed: None,
        }
    }

    /// Adds a staff member.
    pub fn with_staff(mut self, staff: StaffMember) -> Self {
        self.staff_list.push(staff);
        self
    }

    /// Adds a shift definition.
    pub fn with_shift(mut self, shift: ShiftInput) -> Self {
        self.shift_definitions.push(shift);
        self
    }

    /// Adds a leave request.
    pub fn with_leave(mut self, leave: LeaveRequest) -> Self {
        self.leave_dates.push(leave);
        self
    }

    /// Sets the numeric limits.
    pub fn with_limits(mut self, limits: impl Into<LimitsInput>) -> Self {
        self.constraints = limits.into();
        self
    }

    /// Sets the relaxation priority.
    pub fn with_priority(mut self, priority: Vec<ConstraintKind>) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the exact-search time budget.
    pub fn with_time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }

    /// Sets the exact-search node budget.
    pub fn with_node_budget(mut self, nodes: u64) -> Self {
        self.node_budget = Some(nodes);
        self
    }

    /// Adds a per-date requirement override.
    pub fn with_override(mut self, o: RequirementOverride) -> Self {
        self.requirement_overrides.push(o);
        self
    }

    /// Sets the rotation seed.
    pub fn with_rotation_seed(mut self, seed: u64) -> Self {
        self.rotation_seed = Some(seed);
        self
    }
}

impl ShiftInput {
    /// Creates a shift input with a nurse/assistant requirement.
    pub fn new(
        name: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        nurse: i64,
        assistant: i64,
    ) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
            required_staff: Some(RequirementInput {
                nurse: Some(nurse),
                assistant: Some(assistant),
            }),
            night: None,
        }
    }

    /// Sets the explicit night designation.
    pub fn with_night(mut self, night: bool) -> Self {
        self.night = Some(night);
        self
    }
}

impl From<ConstraintLimits> for LimitsInput {
    fn from(l: ConstraintLimits) -> Self {
        Self {
            max_consecutive_shifts: Some(i64::from(l.max_consecutive_shifts)),
            max_night_shifts: Some(i64::from(l.max_night_shifts)),
            max_consecutive_working_hours: Some(i64::from(l.max_consecutive_working_hours)),
            max_shift_diff: Some(i64::from(l.max_shift_diff)),
            max_shift_diff_per_type: Some(i64::from(l.max_shift_diff_per_type)),
        }
    }
}

impl RequirementOverride {
    /// Creates an override.
    pub fn new(date: NaiveDate, shift: impl Into<String>, nurse: i64, assistant: i64) -> Self {
        Self {
            date,
            shift: shift.into(),
            nurse,
            assistant,
        }
    }
}
