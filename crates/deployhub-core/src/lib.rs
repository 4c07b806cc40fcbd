//! # deployhub-core
//!
//! Core crate for DeployHub. Contains configuration schemas, typed
//! identifiers, pagination types, the queue and storage seams shared by
//! the other crates, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DeployHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
