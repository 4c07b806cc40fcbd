//! Background processing for DeployHub.
//!
//! This crate provides:
//! - A queue consumer that turns uploaded deployments into `ready` or
//!   `error` records under a bounded admission gate
//! - A generic periodic batch runner for maintenance work
//! - The expiry job that garbage-collects old artifacts

pub mod consumer;
pub mod error;
pub mod handler;
pub mod jobs;
pub mod processor;
pub mod scheduler;

pub use consumer::DeploymentConsumer;
pub use error::TaskError;
pub use handler::TaskHandler;
pub use jobs::expiry::ExpiryJob;
pub use processor::{DeploymentProcessor, ProcessOutcome};
pub use scheduler::MaintenanceRunner;
