//! Project entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use deployhub_core::types::ProjectId;

/// A named group of deployments sharing a hostname namespace.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// DNS label derived from the name; unique across projects.
    pub slug: String,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// When the project was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Project name.
    pub name: String,
}

/// Data for renaming a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProject {
    /// New project name.
    pub name: String,
}
