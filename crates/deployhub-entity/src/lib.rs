//! # deployhub-entity
//!
//! Domain entity models for DeployHub. Structs here are either database
//! rows (deriving `sqlx::FromRow`) or value objects passed between the
//! upload path, the queue and the workers.

pub mod deployment;
pub mod project;
