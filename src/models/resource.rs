//! Resource (lendable equipment) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::ResourceStatus;

/// Resource record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: i32,
    pub category_id: Option<i32>,
    /// Resource name / label
    pub name: String,
    pub status: ResourceStatus,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Maintenance workflow transition request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateResourceStatus {
    pub status: ResourceStatus,
}
