//! Reverse-proxy configuration output settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which reverse proxy the generated files target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    /// Static file serving through nginx server blocks.
    Nginx,
    /// Traefik file-provider routers pointing at an upstream.
    Traefik,
}

impl fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nginx => write!(f, "nginx"),
            Self::Traefik => write!(f, "traefik"),
        }
    }
}

/// Gateway generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Target proxy.
    #[serde(default = "default_provider")]
    pub provider: GatewayProvider,
    /// Directory the proxy watches for per-project files.
    #[serde(default = "default_config_dir")]
    pub config_dir: String,
    /// Base domain; hostnames are `{hash}.{project}.{domain}`.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Scheme used when building public URLs.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Storage base directory as seen from inside the proxy.
    #[serde(default = "default_proxy_storage_root")]
    pub proxy_storage_root: String,
    /// Upstream every traefik router forwards to.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    /// Port nginx server blocks listen on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Mark deployments without an entry path as failed.
    #[serde(default = "default_true")]
    pub require_entry_path: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            config_dir: default_config_dir(),
            domain: default_domain(),
            scheme: default_scheme(),
            proxy_storage_root: default_proxy_storage_root(),
            upstream_url: default_upstream_url(),
            listen_port: default_listen_port(),
            require_entry_path: true,
        }
    }
}

fn default_provider() -> GatewayProvider {
    GatewayProvider::Nginx
}

fn default_config_dir() -> String {
    "./data/gateway".to_string()
}

fn default_domain() -> String {
    "localhost".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_proxy_storage_root() -> String {
    "/storage".to_string()
}

fn default_upstream_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_listen_port() -> u16 {
    80
}

fn default_true() -> bool {
    true
}
