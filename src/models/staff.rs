//! Staff model.
//!
//! Staff members are read from the ward roster and are immutable for the
//! duration of a run. Only the role matters to the engine: staffing
//! requirements are expressed per role.

use serde::{Deserialize, Serialize};

/// A member of the ward staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    /// Unique staff identifier.
    pub id: String,
    /// Staff category.
    pub role: Role,
    /// Owning ward, when the roster service provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_id: Option<String>,
}

/// Staff category. Each shift requires a count of each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered nurse.
    Nurse,
    /// Nursing assistant.
    Assistant,
}

impl Role {
    /// All roles, in the order requirements are filled.
    pub const ALL: [Role; 2] = [Role::Nurse, Role::Assistant];

    /// Dense index for per-role tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Role::Nurse => 0,
            Role::Assistant => 1,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Nurse => "nurse",
            Role::Assistant => "assistant",
        }
    }
}

impl StaffMember {
    /// Creates a staff member.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            ward_id: None,
        }
    }

    /// Creates a nurse.
    pub fn nurse(id: impl Into<String>) -> Self {
        Self::new(id, Role::Nurse)
    }

    /// Creates an assistant.
    pub fn assistant(id: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant)
    }

    /// Sets the owning ward.
    pub fn with_ward(mut self, ward_id: impl Into<String>) -> Self {
        self.ward_id = Some(ward_id.into());
        self
    }
}
