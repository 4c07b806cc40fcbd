//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so a partial file is
//! enough to boot.

pub mod app;
pub mod database;
pub mod deployment;
pub mod gateway;
pub mod logging;
pub mod queue;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::database::DatabaseConfig;
pub use self::deployment::DeploymentConfig;
pub use self::gateway::{GatewayConfig, GatewayProvider};
pub use self::logging::LoggingConfig;
pub use self::queue::{QueueConfig, RedisQueueConfig};
pub use self::storage::StorageConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (`config/default.toml` + environment overlay + `DEPLOYHUB__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Task queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Artifact storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Reverse-proxy configuration output.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Background consumer and maintenance settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Deployment lifecycle defaults.
    #[serde(default)]
    pub deployment: DeploymentConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default`, `config/{env}` and environment variables
    /// prefixed with `DEPLOYHUB__` (double underscore separates sections,
    /// e.g. `DEPLOYHUB__GATEWAY__DOMAIN`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DEPLOYHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline unusable.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.worker.max_concurrent_tasks == 0 {
            return Err(AppError::configuration(
                "worker.max_concurrent_tasks must be at least 1",
            ));
        }
        if self.worker.expiry_concurrency == 0 {
            return Err(AppError::configuration(
                "worker.expiry_concurrency must be at least 1",
            ));
        }
        if self.gateway.domain.trim().is_empty() {
            return Err(AppError::configuration("gateway.domain must not be empty"));
        }
        if self.storage.base_dir.trim().is_empty() {
            return Err(AppError::configuration("storage.base_dir must not be empty"));
        }
        Ok(())
    }
}
