//! Durable FIFO task queue trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A named-list FIFO queue (producer appends at the tail, consumer pops the
/// head).
///
/// Payloads are opaque strings (JSON in practice). Implementations are
/// responsible for key prefixing.
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g. `"redis"`, `"memory"`).
    fn provider_type(&self) -> &str;

    /// Append a payload to the tail of `queue`.
    async fn push(&self, queue: &str, payload: &str) -> AppResult<()>;

    /// Pop the head of `queue`, waiting up to `timeout` for an item.
    ///
    /// Returns `Ok(None)` when the timeout elapses with the queue empty.
    async fn pop(&self, queue: &str, timeout: Duration) -> AppResult<Option<String>>;

    /// Number of payloads currently waiting in `queue`.
    async fn len(&self, queue: &str) -> AppResult<u64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Serialize `value` as JSON and push it.
    async fn push_json<T: serde::Serialize + Send + Sync>(
        &self,
        queue: &str,
        value: &T,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.push(queue, &json).await
    }
}
