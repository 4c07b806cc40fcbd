//! Deployment repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;
use deployhub_core::types::{DeploymentId, PageRequest, PageResponse};
use deployhub_entity::deployment::{
    CreateDeployment, Deployment, DeploymentFilter, DeploymentStatus, UpdateDeploymentStatus,
};

use super::map_db_error;
use crate::store::DeploymentStore;

/// Columns selected for every deployment read, joined with the project name.
const SELECT_DEPLOYMENT: &str = "SELECT d.id, d.project_id, d.content_hash, d.status, \
     d.entry_path, d.public_url, d.created_at, d.updated_at, d.expires_at, \
     p.name AS project_name \
     FROM deployments d JOIN projects p ON p.id = d.project_id";

/// Filter clause shared by the paged query and its count.
const FILTER_CLAUSE: &str = "($1::uuid IS NULL OR d.project_id = $1) \
     AND ($2::text IS NULL OR d.status::text = $2) \
     AND ($3::text IS NULL OR d.content_hash = $3)";

/// PostgreSQL-backed deployment repository.
#[derive(Debug, Clone)]
pub struct DeploymentRepository {
    pool: PgPool,
}

impl DeploymentRepository {
    /// Create a new deployment repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeploymentStore for DeploymentRepository {
    async fn get_by_id(&self, id: DeploymentId) -> AppResult<Option<Deployment>> {
        sqlx::query_as::<_, Deployment>(&format!("{SELECT_DEPLOYMENT} WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find deployment", e))
    }

    async fn get_paged(
        &self,
        filter: &DeploymentFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Deployment>> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM deployments d WHERE {FILTER_CLAUSE}"
        ))
        .bind(filter.project_id)
        .bind(status)
        .bind(filter.content_hash.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count deployments", e))?;

        let items = sqlx::query_as::<_, Deployment>(&format!(
            "{SELECT_DEPLOYMENT} WHERE {FILTER_CLAUSE} \
             ORDER BY d.created_at DESC, d.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.project_id)
        .bind(status)
        .bind(filter.content_hash.as_deref())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list deployments", e))?;

        Ok(PageResponse::new(
            items,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn create(&self, data: &CreateDeployment) -> AppResult<Deployment> {
        let id = DeploymentId::new();
        sqlx::query(
            "INSERT INTO deployments (id, project_id, content_hash, status, entry_path, expires_at) \
             VALUES ($1, $2, $3, 'pending', $4, $5)",
        )
        .bind(id)
        .bind(data.project_id)
        .bind(&data.content_hash)
        .bind(data.entry_path.as_deref())
        .bind(data.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to create deployment"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal("Deployment vanished after insert"))
    }

    async fn update_status(&self, update: &UpdateDeploymentStatus) -> AppResult<Deployment> {
        let allowed: Vec<&str> = update
            .status
            .predecessors()
            .iter()
            .map(DeploymentStatus::as_str)
            .collect();

        let result = sqlx::query(
            "UPDATE deployments \
             SET status = $2::deployment_status, public_url = COALESCE($3, public_url), updated_at = NOW() \
             WHERE id = $1 AND status::text = ANY($4)",
        )
        .bind(update.id)
        .bind(update.status.as_str())
        .bind(update.public_url.as_deref())
        .bind(&allowed)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update deployment status", e)
        })?;

        let current = self
            .get_by_id(update.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Deployment {} not found", update.id)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "Deployment {} cannot move from {} to {}",
                update.id, current.status, update.status
            )));
        }

        Ok(current)
    }

    async fn get_expired(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<Deployment>> {
        sqlx::query_as::<_, Deployment>(&format!(
            "{SELECT_DEPLOYMENT} \
             WHERE d.status <> 'expired' AND d.expires_at IS NOT NULL AND d.expires_at <= $1 \
             ORDER BY d.expires_at ASC LIMIT $2"
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expired deployments", e)
        })
    }
}
