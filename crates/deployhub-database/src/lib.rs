//! # deployhub-database
//!
//! PostgreSQL connection management, the persistence traits consumed by
//! the services and workers, their sqlx implementations, and an in-memory
//! implementation used by the test suites.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{DeploymentStore, ProjectStore};
