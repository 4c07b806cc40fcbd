//! Project CRUD with gateway and storage bookkeeping.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use validator::Validate;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::types::{PageRequest, PageResponse, ProjectId};
use deployhub_database::store::{DeploymentStore, ProjectStore};
use deployhub_entity::deployment::{DeploymentFilter, DeploymentStatus};
use deployhub_entity::project::{CreateProject, Project, UpdateProject, dns_label};
use deployhub_gateway::GatewaySync;
use deployhub_storage::{ArtifactKey, ArtifactStore};

use crate::validation::validate;

/// Name of a project being created or renamed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectParams {
    /// Display name; slugged into every deployment hostname.
    #[validate(length(min = 3, max = 100))]
    pub name: String,
}

impl ProjectParams {
    /// Trim and validate, returning the name to persist.
    fn into_name(self) -> AppResult<String> {
        let params = Self {
            name: self.name.trim().to_string(),
        };
        validate(&params)?;
        if dns_label(&params.name).is_empty() {
            return Err(AppError::validation(format!(
                "Project name '{}' must contain at least one ASCII letter or digit",
                params.name
            )));
        }
        Ok(params.name)
    }
}

/// Manages projects.
#[derive(Debug, Clone)]
pub struct ProjectService {
    /// Project persistence.
    projects: Arc<dyn ProjectStore>,
    /// Deployment persistence, for in-flight checks.
    deployments: Arc<dyn DeploymentStore>,
    /// Artifact storage, cleared on delete.
    storage: Arc<ArtifactStore>,
    /// Gateway output for the project's hostnames.
    gateway: GatewaySync,
}

impl ProjectService {
    /// Creates a new project service.
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        storage: Arc<ArtifactStore>,
        gateway: GatewaySync,
    ) -> Self {
        Self {
            projects,
            deployments,
            storage,
            gateway,
        }
    }

    /// Create a project. The host label derived from the name must not be
    /// used by another project.
    pub async fn create(&self, params: ProjectParams) -> AppResult<Project> {
        let name = params.into_name()?;
        let project = self.projects.create(&CreateProject { name }).await?;
        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    /// Fetch one project.
    pub async fn get(&self, id: ProjectId) -> AppResult<Project> {
        self.projects
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))
    }

    /// List projects ordered by name.
    pub async fn list(&self, page: PageRequest) -> AppResult<PageResponse<Project>> {
        self.projects.get_paged(&page).await
    }

    /// Rename a project. Every hostname embeds the name, so the gateway
    /// file is rendered again.
    pub async fn rename(&self, id: ProjectId, params: ProjectParams) -> AppResult<Project> {
        let name = params.into_name()?;
        let project = self.projects.update(id, &UpdateProject { name }).await?;
        let routes = self.gateway.regenerate(id).await?;
        info!(project_id = %id, name = %project.name, routes, "Project renamed");
        Ok(project)
    }

    /// Delete a project with its deployments, gateway file and stored
    /// artifacts.
    ///
    /// Refused while an upload is still `pending`, since the worker would
    /// otherwise race the cleanup.
    pub async fn delete(&self, id: ProjectId) -> AppResult<()> {
        let pending = self
            .deployments
            .get_paged(
                &DeploymentFilter {
                    project_id: Some(id),
                    status: Some(DeploymentStatus::Pending),
                    content_hash: None,
                },
                &PageRequest::new(1, 1),
            )
            .await?;
        if pending.total_items > 0 {
            return Err(AppError::conflict(format!(
                "Project {id} has {} pending deployment(s)",
                pending.total_items
            )));
        }

        if !self.projects.delete(id).await? {
            return Err(AppError::not_found(format!("Project {id} not found")));
        }

        self.gateway.remove(id).await?;
        self.storage.remove(&ArtifactKey::project_dir(id)).await?;
        info!(project_id = %id, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use deployhub_core::config::{GatewayConfig, StorageConfig};
    use deployhub_core::error::ErrorKind;
    use deployhub_core::traits::storage::bytes_stream;
    use deployhub_database::MemoryStore;
    use deployhub_entity::deployment::{CreateDeployment, UpdateDeploymentStatus};
    use deployhub_gateway::{GatewayConfigWriter, NginxGateway};

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<MemoryStore>,
        storage: Arc<ArtifactStore>,
        writer: Arc<dyn GatewayConfigWriter>,
        service: ProjectService,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            ArtifactStore::new(&StorageConfig {
                base_dir: dir.path().join("storage").to_string_lossy().to_string(),
                ..Default::default()
            })
            .await
            .unwrap(),
        );
        let gateway_config = GatewayConfig {
            config_dir: dir.path().join("gateway").to_string_lossy().to_string(),
            domain: "example.com".to_string(),
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new());
        let writer: Arc<dyn GatewayConfigWriter> = Arc::new(NginxGateway::new(&gateway_config));
        let gateway = GatewaySync::new(store.clone(), store.clone(), writer.clone(), &gateway_config);
        let service = ProjectService::new(store.clone(), store.clone(), storage.clone(), gateway);
        Fixture {
            _dir: dir,
            store,
            storage,
            writer,
            service,
        }
    }

    fn named(name: &str) -> ProjectParams {
        ProjectParams {
            name: name.to_string(),
        }
    }

    fn site_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("index.html", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"ok").unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Store an artifact and mark its deployment `ready`.
    async fn ready(fx: &Fixture, project_id: ProjectId, hash: &str) {
        let d = DeploymentStore::create(
            fx.store.as_ref(),
            &CreateDeployment {
                project_id,
                content_hash: hash.to_string(),
                entry_path: None,
                expires_at: None,
            },
        )
        .await
        .unwrap();
        let key = ArtifactKey::new(project_id, hash).unwrap();
        fx.storage
            .store(&key, "site.zip", bytes_stream(site_zip()))
            .await
            .unwrap();
        fx.store
            .update_status(&UpdateDeploymentStatus::new(d.id, DeploymentStatus::Ready))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_validates_name() {
        let fx = fixture().await;
        let p = fx.service.create(named("  docs  ")).await.unwrap();
        assert_eq!(p.name, "docs");

        for bad in ["ab", "   ", "!!!!", &"x".repeat(101)] {
            let err = fx.service.create(named(bad)).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "{bad:?}");
        }

        let err = fx.service.create(named("DOCS")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_host_label_collisions_rejected() {
        let fx = fixture().await;
        let site = fx.service.create(named("My Site")).await.unwrap();
        let err = fx.service.create(named("my_site")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let other = fx.service.create(named("other")).await.unwrap();
        let err = fx.service.rename(other.id, named("my  site")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(fx.service.get(other.id).await.unwrap().name, "other");

        ready(&fx, site.id, "abc").await;
        ready(&fx, other.id, "abc").await;
        fx.service.rename(site.id, named("My Site")).await.unwrap();
        fx.service.rename(other.id, named("other")).await.unwrap();
        let site_conf = std::fs::read_to_string(fx.writer.config_path(site.id)).unwrap();
        let other_conf = std::fs::read_to_string(fx.writer.config_path(other.id)).unwrap();
        assert!(site_conf.contains("abc.my-site.example.com"));
        assert!(other_conf.contains("abc.other.example.com"));
        assert!(!other_conf.contains("my-site"));
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let fx = fixture().await;
        let b = fx.service.create(named("beta")).await.unwrap();
        fx.service.create(named("alpha")).await.unwrap();

        assert_eq!(fx.service.get(b.id).await.unwrap().name, "beta");
        assert_eq!(
            fx.service.get(ProjectId::new()).await.unwrap_err().kind,
            ErrorKind::NotFound
        );

        let page = fx.service.list(PageRequest::default()).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_rename_rewrites_hostnames() {
        let fx = fixture().await;
        let p = fx.service.create(named("old-name")).await.unwrap();
        ready(&fx, p.id, "abc").await;
        fx.service.rename(p.id, named("old-name")).await.unwrap();

        let path = fx.writer.config_path(p.id);
        let before = std::fs::read_to_string(&path).unwrap();
        assert!(before.contains("abc.old-name.example.com"));

        fx.service.rename(p.id, named("New Name")).await.unwrap();
        let after = std::fs::read_to_string(&path).unwrap();
        assert!(after.contains("abc.new-name.example.com"));
        assert!(!after.contains("old-name"));
    }

    #[tokio::test]
    async fn test_delete_clears_gateway_and_storage() {
        let fx = fixture().await;
        let p = fx.service.create(named("doomed")).await.unwrap();
        ready(&fx, p.id, "abc").await;
        fx.service.rename(p.id, named("doomed")).await.unwrap();
        assert!(fx.writer.config_path(p.id).exists());

        fx.service.delete(p.id).await.unwrap();

        assert!(!fx.writer.config_path(p.id).exists());
        assert!(!fx.storage.exists(&ArtifactKey::project_dir(p.id)).await);
        assert_eq!(
            fx.service.get(p.id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(
            fx.service.delete(p.id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_refused_while_pending() {
        let fx = fixture().await;
        let p = fx.service.create(named("busy")).await.unwrap();
        DeploymentStore::create(
            fx.store.as_ref(),
            &CreateDeployment {
                project_id: p.id,
                content_hash: "abc".to_string(),
                entry_path: None,
                expires_at: None,
            },
        )
        .await
        .unwrap();

        let err = fx.service.delete(p.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(fx.service.get(p.id).await.is_ok());
    }
}
