//! Maintenance incident endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::maintenance::{MaintenanceIncident, MaintenanceResourceSummary, UpdateIncidentStatus},
};

/// Incident after a status change, with the refreshed resource summary
#[derive(Serialize, ToSchema)]
pub struct IncidentUpdateResponse {
    pub incident: MaintenanceIncident,
    pub summary: MaintenanceResourceSummary,
}

/// Change the status of a maintenance incident
#[utoipa::path(
    put,
    path = "/incidents/{id}/status",
    tag = "maintenance",
    params(
        ("id" = i32, Path, description = "Incident ID")
    ),
    request_body = UpdateIncidentStatus,
    responses(
        (status = 200, description = "Incident updated", body = IncidentUpdateResponse),
        (status = 404, description = "Incident not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_incident_status(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateIncidentStatus>,
) -> AppResult<Json<IncidentUpdateResponse>> {
    let (incident, summary) = state
        .services
        .maintenance
        .update_incident_status(id, request.status, Utc::now())
        .await?;
    Ok(Json(IncidentUpdateResponse { incident, summary }))
}
