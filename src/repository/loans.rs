//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{enums::LoanStatus, loan::Loan, maintenance::ReporterContext},
};

const COLUMNS: &str =
    "id, borrower_id, loan_date, expected_return, actual_return, status, overdue_days, notes";

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    /// Get loan by ID and lock its row until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::LoanNotFound(id))
    }

    /// Lock every unreturned, authorized loan
    pub async fn lock_open(&self, conn: &mut PgConnection) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE actual_return IS NULL AND status IN ($1, $2) ORDER BY id FOR UPDATE",
            COLUMNS
        ))
        .bind(LoanStatus::Active)
        .bind(LoanStatus::Overdue)
        .fetch_all(&mut *conn)
        .await?;
        Ok(loans)
    }

    /// Resource IDs attached to a loan
    pub async fn resource_ids<'e, E: PgExecutor<'e>>(&self, executor: E, loan_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT resource_id FROM loan_resources WHERE loan_id = $1 ORDER BY resource_id",
        )
        .bind(loan_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Resource IDs attached to a loan (pool)
    pub async fn get_resource_ids(&self, loan_id: i32) -> AppResult<Vec<i32>> {
        self.resource_ids(&self.pool, loan_id).await
    }

    /// Insert a new pending loan
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        borrower_id: i32,
        loan_date: DateTime<Utc>,
        expected_return: DateTime<Utc>,
        notes: Option<&str>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (borrower_id, loan_date, expected_return, status, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(borrower_id)
        .bind(loan_date)
        .bind(expected_return)
        .bind(LoanStatus::Pending)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(loan)
    }

    /// Attach resources to a loan
    pub async fn attach_resources(&self, conn: &mut PgConnection, loan_id: i32, resource_ids: &[i32]) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_resources (loan_id, resource_id)
            SELECT $1, UNNEST($2::int[])
            "#,
        )
        .bind(loan_id)
        .bind(resource_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Update the computed status of an unreturned loan
    pub async fn set_status(&self, conn: &mut PgConnection, id: i32, status: LoanStatus) -> AppResult<()> {
        sqlx::query("UPDATE loans SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Record the return of a loan
    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        id: i32,
        actual_return: DateTime<Utc>,
        status: LoanStatus,
        overdue_days: Option<i32>,
        notes: Option<&str>,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET actual_return = $1, status = $2, overdue_days = $3, notes = $4
            WHERE id = $5 AND actual_return IS NULL
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(actual_return)
        .bind(status)
        .bind(overdue_days)
        .bind(notes)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::AlreadyReturned(id))
    }

    /// Check that a borrower exists
    pub async fn borrower_exists(&self, conn: &mut PgConnection, borrower_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(borrower_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }

    /// Reporter context (name, grade, section) of a borrower
    pub async fn reporter(&self, conn: &mut PgConnection, borrower_id: i32) -> AppResult<ReporterContext> {
        let reporter = sqlx::query_as::<_, ReporterContext>(
            r#"
            SELECT NULLIF(TRIM(CONCAT_WS(' ', firstname, lastname)), '') AS name,
                   grade, section
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(borrower_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or_default();
        Ok(reporter)
    }
}
