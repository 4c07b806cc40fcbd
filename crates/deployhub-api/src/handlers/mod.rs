//! Request handlers, grouped by resource.

pub mod deployment;
pub mod health;
pub mod project;
