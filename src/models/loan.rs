//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::damage_report::DamageReport;
use super::enums::{LoanStatus, ResourceStatus};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub borrower_id: i32,
    pub loan_date: DateTime<Utc>,
    pub expected_return: DateTime<Utc>,
    pub actual_return: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    /// Whole days late at return time (never negative)
    pub overdue_days: Option<i32>,
    /// Free-text notes, may carry encoded damage reports
    pub notes: Option<String>,
}

/// Loan with its attached resources
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub resource_ids: Vec<i32>,
}

/// Create loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    pub borrower_id: i32,
    #[validate(length(min = 1, message = "At least one resource is required"))]
    pub resource_ids: Vec<i32>,
    /// Expected return date; defaults to the configured loan duration
    pub expected_return: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Damage information submitted with a return
#[derive(Debug, Clone)]
pub enum DamageInput {
    /// Structured reports, encoded into the notes text before persistence
    Reports(Vec<DamageReport>),
    /// Notes text already in the persisted format (or free prose)
    Notes(String),
}

/// Return loan request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnLoan {
    /// Structured per-resource damage / suggestion reports
    pub reports: Option<Vec<DamageReport>>,
    /// Raw notes text, used when no structured reports are given
    pub notes: Option<String>,
    /// Return timestamp; defaults to the time of the request
    pub returned_at: Option<DateTime<Utc>>,
}

impl ReturnLoan {
    pub fn damage_input(self) -> Option<DamageInput> {
        match (self.reports, self.notes) {
            (Some(reports), _) if !reports.is_empty() => Some(DamageInput::Reports(reports)),
            (_, Some(notes)) if !notes.trim().is_empty() => Some(DamageInput::Notes(notes)),
            _ => None,
        }
    }
}

/// Resource status after a return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceStatusChange {
    pub resource_id: i32,
    pub previous: ResourceStatus,
    pub status: ResourceStatus,
}

/// Outcome of a return operation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan_id: i32,
    pub status: LoanStatus,
    pub overdue_days: Option<i32>,
    pub resources: Vec<ResourceStatusChange>,
    pub incidents_created: usize,
}
