//! Shared status enums stored as SMALLINT codes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LoanStatus {
    Pending = 0,
    Active = 1,
    Overdue = 2,
    Returned = 3,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ResourceStatus
// ---------------------------------------------------------------------------

/// Availability / maintenance status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ResourceStatus {
    Available = 0,
    Loaned = 1,
    Damaged = 2,
    InMaintenance = 3,
    InRepair = 4,
    PartiallyRepaired = 5,
    AwaitingParts = 6,
    RepairedPendingTest = 7,
}

impl ResourceStatus {
    /// Statuses set by the maintenance workflow after the initial damage report
    pub fn is_maintenance_workflow(self) -> bool {
        matches!(
            self,
            ResourceStatus::InMaintenance
                | ResourceStatus::InRepair
                | ResourceStatus::PartiallyRepaired
                | ResourceStatus::AwaitingParts
                | ResourceStatus::RepairedPendingTest
        )
    }

    /// Damaged or any maintenance-workflow status
    pub fn needs_maintenance(self) -> bool {
        self == ResourceStatus::Damaged || self.is_maintenance_workflow()
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Loaned => "loaned",
            ResourceStatus::Damaged => "damaged",
            ResourceStatus::InMaintenance => "in_maintenance",
            ResourceStatus::InRepair => "in_repair",
            ResourceStatus::PartiallyRepaired => "partially_repaired",
            ResourceStatus::AwaitingParts => "awaiting_parts",
            ResourceStatus::RepairedPendingTest => "repaired_pending_test",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// IncidentStatus
// ---------------------------------------------------------------------------

/// Maintenance incident status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum IncidentStatus {
    Pending = 0,
    InProgress = 1,
    Completed = 2,
    Cancelled = 3,
}

impl IncidentStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, IncidentStatus::Completed | IncidentStatus::Cancelled)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Completed => "completed",
            IncidentStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// IncidentPriority
// ---------------------------------------------------------------------------

/// Maintenance incident priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum IncidentPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

// ---------------------------------------------------------------------------
// OverallStatus
// ---------------------------------------------------------------------------

/// Roll-up status of a resource summary: `Completed` once every incident is
/// done, otherwise a mirror of the resource status (same codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum OverallStatus {
    Available = 0,
    Loaned = 1,
    Damaged = 2,
    InMaintenance = 3,
    InRepair = 4,
    PartiallyRepaired = 5,
    AwaitingParts = 6,
    RepairedPendingTest = 7,
    Completed = 100,
}

impl From<ResourceStatus> for OverallStatus {
    fn from(s: ResourceStatus) -> Self {
        match s {
            ResourceStatus::Available => OverallStatus::Available,
            ResourceStatus::Loaned => OverallStatus::Loaned,
            ResourceStatus::Damaged => OverallStatus::Damaged,
            ResourceStatus::InMaintenance => OverallStatus::InMaintenance,
            ResourceStatus::InRepair => OverallStatus::InRepair,
            ResourceStatus::PartiallyRepaired => OverallStatus::PartiallyRepaired,
            ResourceStatus::AwaitingParts => OverallStatus::AwaitingParts,
            ResourceStatus::RepairedPendingTest => OverallStatus::RepairedPendingTest,
        }
    }
}
