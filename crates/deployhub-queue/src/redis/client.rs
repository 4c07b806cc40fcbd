//! Redis connection management.

use redis::Client;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use tracing::info;

use deployhub_core::config::RedisQueueConfig;
use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;

/// Redis client wrapper with connection management.
///
/// Holds a reconnecting [`ConnectionManager`] for short commands and the
/// raw [`Client`] so blocking pops can open their own connection instead of
/// stalling the shared one.
#[derive(Debug, Clone)]
pub struct RedisClient {
    client: Client,
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &RedisQueueConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client.clone()).await.map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to connect to Redis", e)
        })?;

        info!("Connected to Redis");
        Ok(Self {
            client,
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Get a clone of the shared connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Open a dedicated connection for blocking commands.
    pub async fn blocking_connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Queue, "Failed to open blocking Redis connection", e)
            })
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos >= scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
