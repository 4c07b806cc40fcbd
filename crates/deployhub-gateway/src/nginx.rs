//! nginx server-block generation for static serving.

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use deployhub_core::config::{GatewayConfig, GatewayProvider};
use deployhub_core::result::AppResult;
use deployhub_core::types::ProjectId;
use deployhub_entity::deployment::GatewayRoute;
use deployhub_entity::deployment::model::storage_key;

use crate::atomic::{remove_if_exists, write_atomic};
use crate::hostname::hostname;
use crate::writer::{GatewayConfigWriter, sorted};

/// Writes `{project_id}.conf` files with one `server` block per route.
#[derive(Debug, Clone)]
pub struct NginxGateway {
    config_dir: PathBuf,
    domain: String,
    storage_root: String,
    listen_port: u16,
}

impl NginxGateway {
    /// Create a writer from gateway settings.
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            config_dir: PathBuf::from(&config.config_dir),
            domain: config.domain.clone(),
            storage_root: config.proxy_storage_root.trim_end_matches('/').to_string(),
            listen_port: config.listen_port,
        }
    }

    /// Render the full file for a project.
    pub fn render(&self, project_name: &str, routes: &[GatewayRoute]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Auto-generated nginx config for project: {project_name}");
        let _ = writeln!(out, "# Generated for deployments: {}", routes.len());
        out.push('\n');

        for route in sorted(routes) {
            self.render_server(&mut out, project_name, route);
        }
        out
    }

    fn render_server(&self, out: &mut String, project_name: &str, route: &GatewayRoute) {
        let dir = format!(
            "{}/{}",
            self.storage_root,
            storage_key(route.project_id, &route.content_hash)
        );

        let _ = writeln!(out, "server {{");
        let _ = writeln!(
            out,
            "    server_name {};",
            hostname(&route.content_hash, project_name, &self.domain)
        );
        let _ = writeln!(out, "    listen {};", self.listen_port);
        out.push('\n');

        match Location::from_entry(route.entry_path.as_deref()) {
            Location::Root => {
                let _ = writeln!(out, "    location / {{");
                let _ = writeln!(out, "        root {dir};");
                let _ = writeln!(out, "        index index.html;");
                let _ = writeln!(out, "    }}");
            }
            Location::File { dir: sub, file } => {
                let _ = writeln!(out, "    location / {{");
                let _ = writeln!(out, "        alias {dir}{sub}/;");
                let _ = writeln!(out, "        try_files $uri /{file} =404;");
                let _ = writeln!(out, "    }}");
            }
            Location::Directory(prefix) => {
                let _ = writeln!(out, "    location {prefix} {{");
                let _ = writeln!(out, "        alias {dir}{prefix};");
                let _ = writeln!(out, "        try_files $uri =404;");
                let _ = writeln!(out, "    }}");
            }
        }

        out.push_str("}\n\n");
    }
}

/// How an entry path maps onto a `location` block.
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    /// Serve the whole artifact with `index.html` fallback.
    Root,
    /// Serve a directory, falling back to one file (SPA style).
    File { dir: &'a str, file: &'a str },
    /// Serve a sub-directory under the same URL prefix.
    Directory(&'a str),
}

impl<'a> Location<'a> {
    fn from_entry(entry_path: Option<&'a str>) -> Self {
        let Some(entry) = entry_path.filter(|e| !e.is_empty() && *e != "/") else {
            return Self::Root;
        };

        let (dir, last) = entry.rsplit_once('/').unwrap_or(("", entry));
        if last.contains('.') {
            Self::File { dir, file: last }
        } else {
            Self::Directory(entry)
        }
    }
}

#[async_trait]
impl GatewayConfigWriter for NginxGateway {
    fn provider(&self) -> GatewayProvider {
        GatewayProvider::Nginx
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

        let rendered = self.render(project_name, routes);
        write_atomic(&self.config_dir, &file_name(project_id), rendered.as_bytes()).await?;
        info!(%project_id, routes = routes.len(), "Wrote nginx config");
        Ok(())
    }

    async fn remove_project_config(&self, project_id: ProjectId) -> AppResult<()> {
        if remove_if_exists(&self.config_path(project_id)).await? {
            debug!(%project_id, "Removed nginx config");
        }
        Ok(())
    }
}

fn file_name(project_id: ProjectId) -> String {
    format!("{project_id}.conf")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use deployhub_core::types::DeploymentId;

    use super::*;

    fn gateway(dir: &Path) -> NginxGateway {
        NginxGateway::new(&GatewayConfig {
            config_dir: dir.to_string_lossy().to_string(),
            domain: "example.com".to_string(),
            proxy_storage_root: "/storage/".to_string(),
            ..Default::default()
        })
    }

    fn route(project_id: ProjectId, hash: &str, entry: Option<&str>) -> GatewayRoute {
        GatewayRoute {
            content_hash: hash.to_string(),
            deployment_id: DeploymentId::new(),
            project_id,
            project_name: "Site".to_string(),
            entry_path: entry.map(str::to_string),
        }
    }

    #[test]
    fn test_location_classification() {
        assert_eq!(Location::from_entry(None), Location::Root);
        assert_eq!(Location::from_entry(Some("/")), Location::Root);
        assert_eq!(
            Location::from_entry(Some("/index.html")),
            Location::File { dir: "", file: "index.html" }
        );
        assert_eq!(
            Location::from_entry(Some("/app/main.html")),
            Location::File { dir: "/app", file: "main.html" }
        );
        assert_eq!(Location::from_entry(Some("/docs")), Location::Directory("/docs"));
    }

    #[test]
    fn test_render_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        let project = ProjectId::new();
        let rendered = gw.render(
            "Site",
            &[
                route(project, "aaa", None),
                route(project, "bbb", Some("/index.html")),
                route(project, "ccc", Some("/docs")),
            ],
        );

        assert!(rendered.starts_with(
            "# Auto-generated nginx config for project: Site\n# Generated for deployments: 3\n\n"
        ));
        assert!(rendered.contains("server_name aaa.site.example.com;"));
        assert!(rendered.contains(&format!("root /storage/deployments/{project}/aaa;")));
        assert!(rendered.contains(&format!("alias /storage/deployments/{project}/bbb/;")));
        assert!(rendered.contains("try_files $uri /index.html =404;"));
        assert!(rendered.contains("location /docs {"));
        assert!(rendered.contains(&format!("alias /storage/deployments/{project}/ccc/docs;")));
        assert_eq!(rendered.matches("server {").count(), 3);
    }

    #[test]
    fn test_render_is_order_independent() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        let project = ProjectId::new();
        let a = route(project, "aaa", None);
        let b = route(project, "bbb", Some("/docs"));

        assert_eq!(
            gw.render("Site", &[a.clone(), b.clone()]),
            gw.render("Site", &[b, a])
        );
    }

    #[tokio::test]
    async fn test_empty_routes_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        let project = ProjectId::new();

        gw.write_project_config(project, "Site", &[route(project, "aaa", None)])
            .await
            .unwrap();
        assert!(gw.config_path(project).is_file());

        gw.write_project_config(project, "Site", &[]).await.unwrap();
        assert!(!gw.config_path(project).exists());

        gw.remove_project_config(project).await.unwrap();
    }
}
