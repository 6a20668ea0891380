//! Resources repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{enums::ResourceStatus, resource::Resource},
};

#[derive(Clone)]
pub struct ResourcesRepository {
    pool: Pool<Postgres>,
}

impl ResourcesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get resource by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>(
            "SELECT id, category_id, name, status, modif_date FROM resources WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(id.to_string()))
    }

    /// Lock one resource row
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>(
            "SELECT id, category_id, name, status, modif_date FROM resources WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(id.to_string()))
    }

    /// Lock several resource rows, always in id order
    pub async fn lock_many(&self, conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, category_id, name, status, modif_date
            FROM resources
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

        if let Some(missing) = ids.iter().find(|id| !rows.iter().any(|r| r.id == **id)) {
            return Err(AppError::ResourceNotFound(missing.to_string()));
        }
        Ok(rows)
    }

    /// Check that a resource exists
    pub async fn exists(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM resources WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }

    /// Write a resource status
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: ResourceStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE resources SET status = $1, modif_date = $2 WHERE id = $3")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound(id.to_string()));
        }
        Ok(())
    }
}
