//! # deployhub-queue
//!
//! Durable FIFO task queues for DeployHub. Two providers:
//!
//! - **redis**: `RPUSH` / `BLPOP` on prefixed list keys using the
//!   [redis](https://crates.io/crates/redis) crate
//! - **memory**: in-process lists for single-node runs and tests
//!
//! The provider is selected at runtime from configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::QueueManager;
