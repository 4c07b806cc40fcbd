//! # deployhub-gateway
//!
//! Renders per-project reverse-proxy configuration from the set of
//! `ready` deployments and writes it into a directory watched by the
//! proxy. Output is a pure function of the route set, and files are
//! replaced atomically; the proxy itself is never signalled.

pub mod atomic;
pub mod hostname;
pub mod nginx;
pub mod provider;
pub mod sync;
pub mod traefik;
pub mod writer;

pub use nginx::NginxGateway;
pub use provider::build_gateway;
pub use sync::GatewaySync;
pub use traefik::TraefikGateway;
pub use writer::GatewayConfigWriter;
