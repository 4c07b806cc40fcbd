//! Redis queue provider.

pub mod client;
pub mod queue;

pub use client::RedisClient;
pub use queue::RedisTaskQueue;
