//! Writer selection.

use std::sync::Arc;

use tracing::info;

use deployhub_core::config::{GatewayConfig, GatewayProvider};

use crate::nginx::NginxGateway;
use crate::traefik::TraefikGateway;
use crate::writer::GatewayConfigWriter;

/// Build the writer for the configured proxy.
pub fn build_gateway(config: &GatewayConfig) -> Arc<dyn GatewayConfigWriter> {
    info!(
        provider = %config.provider,
        config_dir = %config.config_dir,
        domain = %config.domain,
        "Initializing gateway config writer"
    );
    match config.provider {
        GatewayProvider::Nginx => Arc::new(NginxGateway::new(config)),
        GatewayProvider::Traefik => Arc::new(TraefikGateway::new(config)),
    }
}
