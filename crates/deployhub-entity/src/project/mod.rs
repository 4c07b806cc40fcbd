//! Project domain entities.

pub mod label;
pub mod model;

pub use label::dns_label;
pub use model::{CreateProject, Project, UpdateProject};
