//! Project management.

pub mod service;

pub use service::{ProjectParams, ProjectService};
