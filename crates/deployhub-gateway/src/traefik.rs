//! Traefik file-provider configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use deployhub_core::config::{GatewayConfig, GatewayProvider};
use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;
use deployhub_core::types::ProjectId;
use deployhub_entity::deployment::GatewayRoute;

use crate::atomic::{remove_if_exists, write_atomic};
use crate::hostname::hostname;
use crate::writer::GatewayConfigWriter;

#[derive(Debug, Serialize)]
struct DynamicConfig {
    http: HttpConfig,
}

#[derive(Debug, Serialize)]
struct HttpConfig {
    routers: BTreeMap<String, Router>,
    services: BTreeMap<String, Service>,
}

#[derive(Debug, Serialize)]
struct Router {
    rule: String,
    service: String,
}

#[derive(Debug, Serialize)]
struct Service {
    #[serde(rename = "loadBalancer")]
    load_balancer: LoadBalancer,
}

#[derive(Debug, Serialize)]
struct LoadBalancer {
    servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
struct Server {
    url: String,
}

/// Writes `{project_id}.yaml` with one router and service per route, all
/// forwarding to the configured upstream.
#[derive(Debug, Clone)]
pub struct TraefikGateway {
    config_dir: PathBuf,
    domain: String,
    upstream_url: String,
}

impl TraefikGateway {
    /// Create a writer from gateway settings.
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            config_dir: PathBuf::from(&config.config_dir),
            domain: config.domain.clone(),
            upstream_url: config.upstream_url.clone(),
        }
    }

    /// Render the YAML document for a project.
    pub fn render(&self, project_name: &str, routes: &[GatewayRoute]) -> AppResult<String> {
        let mut routers = BTreeMap::new();
        let mut services = BTreeMap::new();

        for route in routes {
            let name = format!("deploy-{}", route.deployment_id);
            routers.insert(
                name.clone(),
                Router {
                    rule: format!(
                        "Host(`{}`)",
                        hostname(&route.content_hash, project_name, &self.domain)
                    ),
                    service: name.clone(),
                },
            );
            services.insert(
                name,
                Service {
                    load_balancer: LoadBalancer {
                        servers: vec![Server {
                            url: self.upstream_url.clone(),
                        }],
                    },
                },
            );
        }

        let doc = DynamicConfig {
            http: HttpConfig { routers, services },
        };
        serde_yaml::to_string(&doc).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Failed to render traefik config", e)
        })
    }
}

#[async_trait]
impl GatewayConfigWriter for TraefikGateway {
    fn provider(&self) -> GatewayProvider {
        GatewayProvider::Traefik
    }

    fn config_path(&self, project_id: ProjectId) -> PathBuf {
        self.config_dir.join(file_name(project_id))
    }

    async fn write_project_config(
        &self,
        project_id: ProjectId,
        project_name: &str,
        routes: &[GatewayRoute],
    ) -> AppResult<()> {
        if routes.is_empty() {
            return self.remove_project_config(project_id).await;
        }

        let rendered = self.render(project_name, routes)?;
        write_atomic(&self.config_dir, &file_name(project_id), rendered.as_bytes()).await?;
        info!(%project_id, routes = routes.len(), "Wrote traefik config");
        Ok(())
    }

    async fn remove_project_config(&self, project_id: ProjectId) -> AppResult<()> {
        if remove_if_exists(&self.config_path(project_id)).await? {
            debug!(%project_id, "Removed traefik config");
        }
        Ok(())
    }
}

fn file_name(project_id: ProjectId) -> String {
    format!("{project_id}.yaml")
}
