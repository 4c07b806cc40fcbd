//! # deployhub-service
//!
//! Application use cases for DeployHub. The upload flow persists a
//! `pending` record, stores the archive and enqueues it for the worker;
//! project management keeps the gateway output and stored artifacts in
//! step with the project records.
//!
//! Services follow constructor injection: every dependency is handed in
//! as an `Arc` at construction time.

pub mod deployment;
pub mod project;
pub mod validation;

pub use deployment::{DeploymentService, UploadParams};
pub use project::{ProjectParams, ProjectService};
