//! Deployment upload and read operations.

pub mod service;

pub use service::{DeploymentService, UploadParams};
