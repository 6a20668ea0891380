//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, loans, maintenance, resources};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Equipment Loan API",
        version = "1.0.0",
        description = "Equipment loans, damage reports and maintenance tracking REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::create_loan,
        loans::get_loan,
        loans::get_damage_reports,
        loans::authorize_loan,
        loans::return_loan,
        loans::refresh_overdue,
        // Resources
        resources::get_resource,
        resources::get_maintenance_state,
        resources::list_incidents,
        resources::update_status,
        // Maintenance
        maintenance::update_incident_status,
    ),
    components(
        schemas(
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoan,
            crate::models::loan::ReturnLoan,
            crate::models::loan::ReturnOutcome,
            crate::models::loan::ResourceStatusChange,
            crate::models::damage_report::DamageReport,
            crate::models::damage_report::DecodedNotes,
            loans::RefreshOverdueResponse,
            // Resources
            crate::models::resource::Resource,
            crate::models::resource::UpdateResourceStatus,
            // Maintenance
            crate::models::maintenance::MaintenanceIncident,
            crate::models::maintenance::MaintenanceResourceSummary,
            crate::models::maintenance::UpdateIncidentStatus,
            maintenance::IncidentUpdateResponse,
            // Enums
            crate::models::enums::LoanStatus,
            crate::models::enums::ResourceStatus,
            crate::models::enums::IncidentStatus,
            crate::models::enums::IncidentPriority,
            crate::models::enums::OverallStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle and returns"),
        (name = "resources", description = "Resource status and maintenance state"),
        (name = "maintenance", description = "Maintenance incidents")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
