//! Maintenance incident and per-resource summary models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{IncidentPriority, IncidentStatus, OverallStatus};

/// One tracked unit of repair work against a resource
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceIncident {
    pub id: i32,
    pub resource_id: i32,
    /// Sequence number, unique per resource (1, 2, 3, ...)
    pub incident_number: i32,
    pub damage_type: String,
    pub description: String,
    pub reporter_name: Option<String>,
    pub reporter_grade: Option<String>,
    pub reporter_section: Option<String>,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Incident about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub resource_id: i32,
    pub incident_number: i32,
    pub damage_type: String,
    pub description: String,
    pub reporter: ReporterContext,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub created_at: DateTime<Utc>,
}

/// Who reported the damage (the borrower returning the loan)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReporterContext {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub section: Option<String>,
}

/// Cached roll-up of a resource's incidents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceResourceSummary {
    pub resource_id: i32,
    pub total_incidents: i32,
    pub completed_incidents: i32,
    /// completed / total * 100, 0 when there is no incident
    pub completion_percentage: f64,
    pub overall_status: OverallStatus,
    pub primary_reporter: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Incident status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIncidentStatus {
    pub status: IncidentStatus,
}
