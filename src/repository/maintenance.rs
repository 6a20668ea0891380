//! Maintenance incidents and per-resource summaries

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::IncidentStatus,
        maintenance::{MaintenanceIncident, MaintenanceResourceSummary, NewIncident},
    },
};

const INCIDENT_COLUMNS: &str = "id, resource_id, incident_number, damage_type, description, \
    reporter_name, reporter_grade, reporter_section, status, priority, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "resource_id, total_incidents, completed_incidents, \
    completion_percentage, overall_status, primary_reporter, updated_at";

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: Pool<Postgres>,
}

impl MaintenanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Number of incidents recorded against a resource
    pub async fn count_for_resource(&self, conn: &mut PgConnection, resource_id: i32) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_incidents WHERE resource_id = $1")
                .bind(resource_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }

    /// All incidents of a resource, by incident number
    pub async fn list_for_resource<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        resource_id: i32,
    ) -> AppResult<Vec<MaintenanceIncident>> {
        let rows = sqlx::query_as::<_, MaintenanceIncident>(&format!(
            "SELECT {} FROM maintenance_incidents WHERE resource_id = $1 ORDER BY incident_number",
            INCIDENT_COLUMNS
        ))
        .bind(resource_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// All incidents of a resource (pool)
    pub async fn get_for_resource(&self, resource_id: i32) -> AppResult<Vec<MaintenanceIncident>> {
        self.list_for_resource(&self.pool, resource_id).await
    }

    /// Insert an incident
    pub async fn insert(&self, conn: &mut PgConnection, incident: &NewIncident) -> AppResult<MaintenanceIncident> {
        let row = sqlx::query_as::<_, MaintenanceIncident>(&format!(
            r#"
            INSERT INTO maintenance_incidents (
                resource_id, incident_number, damage_type, description,
                reporter_name, reporter_grade, reporter_section,
                status, priority, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            INCIDENT_COLUMNS
        ))
        .bind(incident.resource_id)
        .bind(incident.incident_number)
        .bind(&incident.damage_type)
        .bind(&incident.description)
        .bind(&incident.reporter.name)
        .bind(&incident.reporter.grade)
        .bind(&incident.reporter.section)
        .bind(incident.status)
        .bind(incident.priority)
        .bind(incident.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::Conflict(format!(
                    "Incident #{} already exists for resource {}",
                    incident.incident_number, incident.resource_id
                ))
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(row)
    }

    /// Get an incident by ID
    pub async fn get_incident<'e, E: PgExecutor<'e>>(&self, executor: E, id: i32) -> AppResult<MaintenanceIncident> {
        sqlx::query_as::<_, MaintenanceIncident>(&format!(
            "SELECT {} FROM maintenance_incidents WHERE id = $1",
            INCIDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance incident {} not found", id)))
    }

    /// Lock an incident row
    pub async fn lock_incident(&self, conn: &mut PgConnection, id: i32) -> AppResult<MaintenanceIncident> {
        sqlx::query_as::<_, MaintenanceIncident>(&format!(
            "SELECT {} FROM maintenance_incidents WHERE id = $1 FOR UPDATE",
            INCIDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance incident {} not found", id)))
    }

    /// Change the status of an incident
    pub async fn set_incident_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: IncidentStatus,
        now: DateTime<Utc>,
    ) -> AppResult<MaintenanceIncident> {
        let row = sqlx::query_as::<_, MaintenanceIncident>(&format!(
            "UPDATE maintenance_incidents SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            INCIDENT_COLUMNS
        ))
        .bind(status)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Stored summary of a resource, if any incident was ever recorded
    pub async fn get_summary(&self, resource_id: i32) -> AppResult<Option<MaintenanceResourceSummary>> {
        let row = sqlx::query_as::<_, MaintenanceResourceSummary>(&format!(
            "SELECT {} FROM maintenance_resource_summaries WHERE resource_id = $1",
            SUMMARY_COLUMNS
        ))
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or replace the summary of a resource
    pub async fn upsert_summary(&self, conn: &mut PgConnection, summary: &MaintenanceResourceSummary) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO maintenance_resource_summaries (
                resource_id, total_incidents, completed_incidents,
                completion_percentage, overall_status, primary_reporter, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (resource_id) DO UPDATE SET
                total_incidents = EXCLUDED.total_incidents,
                completed_incidents = EXCLUDED.completed_incidents,
                completion_percentage = EXCLUDED.completion_percentage,
                overall_status = EXCLUDED.overall_status,
                primary_reporter = EXCLUDED.primary_reporter,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(summary.resource_id)
        .bind(summary.total_incidents)
        .bind(summary.completed_incidents)
        .bind(summary.completion_percentage)
        .bind(summary.overall_status)
        .bind(&summary.primary_reporter)
        .bind(summary.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
