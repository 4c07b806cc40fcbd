//! Project repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;
use deployhub_core::types::{PageRequest, PageResponse, ProjectId};
use deployhub_entity::project::{CreateProject, Project, UpdateProject, dns_label};

use super::map_db_error;
use crate::store::ProjectStore;

/// PostgreSQL-backed project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn get_by_id(&self, id: ProjectId) -> AppResult<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find project", e))
    }

    async fn get_paged(&self, page: &PageRequest) -> AppResult<PageResponse<Project>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count projects", e)
            })?;

        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects ORDER BY name ASC, id ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list projects", e))?;

        Ok(PageResponse::new(
            projects,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn create(&self, data: &CreateProject) -> AppResult<Project> {
        sqlx::query_as::<_, Project>(
            "INSERT INTO projects (id, name, slug) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(ProjectId::new())
        .bind(&data.name)
        .bind(dns_label(&data.name))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to create project"))
    }

    async fn update(&self, id: ProjectId, data: &UpdateProject) -> AppResult<Project> {
        sqlx::query_as::<_, Project>(
            "UPDATE projects SET name = $2, slug = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&data.name)
        .bind(dns_label(&data.name))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to update project"))?
        .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))
    }

    async fn delete(&self, id: ProjectId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete project", e))?;
        Ok(result.rows_affected() > 0)
    }
}
