//! Redis-backed task queue.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;
use deployhub_core::traits::queue::TaskQueue;

use super::client::RedisClient;

/// Task queue on Redis lists: producers `RPUSH`, the consumer `BLPOP`s.
#[derive(Debug)]
pub struct RedisTaskQueue {
    client: RedisClient,
    /// Lazily opened connection reserved for `BLPOP`.
    blocking: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTaskQueue {
    /// Create a new Redis task queue.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            blocking: Mutex::new(None),
        }
    }

    fn list_key(&self, queue: &str) -> String {
        self.client.prefixed_key(&format!("queue:{queue}"))
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Queue, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    fn provider_type(&self) -> &str {
        "redis"
    }

    async fn push(&self, queue: &str, payload: &str) -> AppResult<()> {
        let key = self.list_key(queue);
        let mut conn = self.client.conn_mut();
        let len: u64 = conn.rpush(&key, payload).await.map_err(Self::map_err)?;
        debug!(queue, len, "Pushed task");
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> AppResult<Option<String>> {
        let key = self.list_key(queue);

        let mut guard = self.blocking.lock().await;
        let mut conn = match guard.as_ref() {
            Some(conn) => conn.clone(),
            None => {
                let conn = self.client.blocking_connection().await?;
                *guard = Some(conn.clone());
                conn
            }
        };

        // BLPOP replies with [key, value] or nil on timeout.
        let reply: redis::RedisResult<Option<(String, String)>> = redis::cmd("BLPOP")
            .arg(&key)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(item) => Ok(item.map(|(_, payload)| payload)),
            Err(e) if e.is_timeout() => {
                debug!(queue, "BLPOP timed out client-side");
                Ok(None)
            }
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    warn!(queue, error = %e, "Dropping blocking Redis connection");
                    *guard = None;
                }
                Err(Self::map_err(e))
            }
        }
    }

    async fn len(&self, queue: &str) -> AppResult<u64> {
        let key = self.list_key(queue);
        let mut conn = self.client.conn_mut();
        conn.llen(&key).await.map_err(Self::map_err)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
