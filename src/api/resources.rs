//! Resource and maintenance state endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        maintenance::{MaintenanceIncident, MaintenanceResourceSummary},
        resource::{Resource, UpdateResourceStatus},
    },
};

/// Get a resource
#[utoipa::path(
    get,
    path = "/resources/{id}",
    tag = "resources",
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Resource", body = Resource),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Resource>> {
    let resource = state.services.resources.get_by_id(id).await?;
    Ok(Json(resource))
}

/// Maintenance summary of a resource
#[utoipa::path(
    get,
    path = "/resources/{id}/maintenance",
    tag = "resources",
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Maintenance summary", body = MaintenanceResourceSummary),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_maintenance_state(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceResourceSummary>> {
    let summary = state.services.maintenance.get_resource_maintenance_state(id).await?;
    Ok(Json(summary))
}

/// Maintenance incidents of a resource
#[utoipa::path(
    get,
    path = "/resources/{id}/incidents",
    tag = "resources",
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Incidents by number", body = Vec<MaintenanceIncident>),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn list_incidents(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<MaintenanceIncident>>> {
    let incidents = state.services.maintenance.list_incidents(id).await?;
    Ok(Json(incidents))
}

/// Move a resource along the maintenance workflow
#[utoipa::path(
    put,
    path = "/resources/{id}/status",
    tag = "resources",
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    request_body = UpdateResourceStatus,
    responses(
        (status = 200, description = "Resource updated", body = Resource),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateResourceStatus>,
) -> AppResult<Json<Resource>> {
    let resource = state
        .services
        .resources
        .advance_status(id, request.status, Utc::now())
        .await?;
    Ok(Json(resource))
}
