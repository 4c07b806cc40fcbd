//! In-memory implementation of the persistence traits.
//!
//! Mirrors the PostgreSQL repositories closely enough (ordering, guarded
//! status transitions, unique project slugs, cascade delete) for the
//! worker and service test suites to run without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::types::{DeploymentId, PageRequest, PageResponse, ProjectId};
use deployhub_entity::deployment::{
    CreateDeployment, Deployment, DeploymentFilter, DeploymentStatus, UpdateDeploymentStatus,
};
use deployhub_entity::project::{CreateProject, Project, UpdateProject, dns_label};

use crate::store::{DeploymentStore, ProjectStore};

#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<ProjectId, Project>,
    deployments: HashMap<DeploymentId, Deployment>,
}

impl Tables {
    /// Unique index on `projects.slug`.
    fn ensure_slug_free(&self, slug: &str, except: Option<ProjectId>) -> AppResult<()> {
        match self
            .projects
            .values()
            .find(|p| p.slug == slug && Some(p.id) != except)
        {
            Some(existing) => Err(AppError::conflict(format!(
                "Project host label '{slug}' is already used by '{}'",
                existing.name
            ))),
            None => Ok(()),
        }
    }

    fn with_project_name(&self, mut deployment: Deployment) -> Deployment {
        deployment.project_name = self
            .projects
            .get(&deployment.project_id)
            .map(|p| p.name.clone());
        deployment
    }
}

/// Process-local store implementing both [`DeploymentStore`] and
/// [`ProjectStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the expiry of a deployment. Test helper.
    pub async fn set_expires_at(
        &self,
        id: DeploymentId,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let deployment = tables
            .deployments
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Deployment {id} not found")))?;
        deployment.expires_at = expires_at;
        Ok(())
    }
}

fn paginate<T>(mut items: Vec<T>, page: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let start = (page.offset() as usize).min(items.len());
    let end = (start + page.limit() as usize).min(items.len());
    let page_items: Vec<T> = items.drain(start..end).collect();
    PageResponse::new(page_items, page.page, page.page_size, total)
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn get_by_id(&self, id: DeploymentId) -> AppResult<Option<Deployment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .deployments
            .get(&id)
            .cloned()
            .map(|d| tables.with_project_name(d)))
    }

    async fn get_paged(
        &self,
        filter: &DeploymentFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Deployment>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Deployment> = tables
            .deployments
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .map(|d| tables.with_project_name(d))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(matching, page))
    }

    async fn create(&self, data: &CreateDeployment) -> AppResult<Deployment> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&data.project_id) {
            return Err(AppError::not_found(format!(
                "Project {} not found",
                data.project_id
            )));
        }

        let now = Utc::now();
        let deployment = Deployment {
            id: DeploymentId::new(),
            project_id: data.project_id,
            content_hash: data.content_hash.clone(),
            status: DeploymentStatus::Pending,
            entry_path: data.entry_path.clone(),
            public_url: None,
            created_at: now,
            updated_at: now,
            expires_at: data.expires_at,
            project_name: None,
        };
        tables.deployments.insert(deployment.id, deployment.clone());
        Ok(tables.with_project_name(deployment))
    }

    async fn update_status(&self, update: &UpdateDeploymentStatus) -> AppResult<Deployment> {
        let mut tables = self.tables.write().await;
        let deployment = tables
            .deployments
            .get_mut(&update.id)
            .ok_or_else(|| AppError::not_found(format!("Deployment {} not found", update.id)))?;

        if !deployment.status.can_transition_to(update.status) {
            return Err(AppError::conflict(format!(
                "Deployment {} cannot move from {} to {}",
                update.id, deployment.status, update.status
            )));
        }

        deployment.status = update.status;
        if let Some(url) = &update.public_url {
            deployment.public_url = Some(url.clone());
        }
        deployment.updated_at = Utc::now();

        let updated = deployment.clone();
        Ok(tables.with_project_name(updated))
    }

    async fn get_expired(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<Deployment>> {
        let tables = self.tables.read().await;
        let mut expired: Vec<Deployment> = tables
            .deployments
            .values()
            .filter(|d| d.status != DeploymentStatus::Expired && d.is_expired_at(now))
            .cloned()
            .map(|d| tables.with_project_name(d))
            .collect();
        expired.sort_by_key(|d| d.expires_at);
        expired.truncate(limit as usize);
        Ok(expired)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_by_id(&self, id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn get_paged(&self, page: &PageRequest) -> AppResult<PageResponse<Project>> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(projects, page))
    }

    async fn create(&self, data: &CreateProject) -> AppResult<Project> {
        let mut tables = self.tables.write().await;
        let slug = dns_label(&data.name);
        tables.ensure_slug_free(&slug, None)?;

        let now = Utc::now();
        let project = Project {
            id: ProjectId::new(),
            name: data.name.clone(),
            slug,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update(&self, id: ProjectId, data: &UpdateProject) -> AppResult<Project> {
        let mut tables = self.tables.write().await;
        let slug = dns_label(&data.name);
        tables.ensure_slug_free(&slug, Some(id))?;

        let project = tables
            .projects
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))?;
        project.name = data.name.clone();
        project.slug = slug;
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete(&self, id: ProjectId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.projects.remove(&id).is_some();
        if removed {
            tables.deployments.retain(|_, d| d.project_id != id);
        }
        Ok(removed)
    }
}
