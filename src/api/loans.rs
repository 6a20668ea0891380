//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        damage_report::DecodedNotes,
        loan::{CreateLoan, LoanDetails, ReturnLoan, ReturnOutcome},
    },
};

/// Overdue refresh result
#[derive(Serialize, ToSchema)]
pub struct RefreshOverdueResponse {
    /// Number of loans whose status changed
    pub updated: u64,
}

/// Request a new loan
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan requested, pending authorization", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Borrower or resource not found"),
        (status = 422, description = "Resource not available")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    request.validate()?;

    let loan = state.services.loans.create_loan(&request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Get a loan with its resources
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Damage reports recorded in a loan's notes
#[utoipa::path(
    get,
    path = "/loans/{id}/damage-reports",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Decoded damage reports", body = DecodedNotes),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_damage_reports(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<DecodedNotes>> {
    let reports = state.services.loans.get_loan_damage_reports(loan_id).await?;
    Ok(Json(reports))
}

/// Authorize a pending loan
#[utoipa::path(
    post,
    path = "/loans/{id}/authorize",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan authorized", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending"),
        (status = 422, description = "A resource is no longer available")
    )
)]
pub async fn authorize_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.authorize_loan(loan_id, Utc::now()).await?;
    Ok(Json(loan))
}

/// Return a loan, with optional damage reports
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnLoan,
    responses(
        (status = 200, description = "Loan returned", body = ReturnOutcome),
        (status = 400, description = "Report names a resource outside the loan"),
        (status = 404, description = "Loan or resource not found"),
        (status = 409, description = "Already returned or never authorized")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<ReturnLoan>,
) -> AppResult<Json<ReturnOutcome>> {
    let now = request.returned_at.unwrap_or_else(Utc::now);

    let outcome = state
        .services
        .loans
        .return_loan(loan_id, request.damage_input(), now)
        .await?;
    Ok(Json(outcome))
}

/// Recompute active / overdue status of open loans
#[utoipa::path(
    post,
    path = "/loans/refresh-overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Statuses refreshed", body = RefreshOverdueResponse)
    )
)]
pub async fn refresh_overdue(State(state): State<crate::AppState>) -> AppResult<Json<RefreshOverdueResponse>> {
    let updated = state.services.loans.refresh_overdue(Utc::now()).await?;
    Ok(Json(RefreshOverdueResponse { updated }))
}
