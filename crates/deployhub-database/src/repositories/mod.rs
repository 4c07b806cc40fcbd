//! sqlx repository implementations.

pub mod deployment;
pub mod project;

pub use deployment::DeploymentRepository;
pub use project::ProjectRepository;

use deployhub_core::error::{AppError, ErrorKind};

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map constraint violations to domain kinds; everything else is a
/// database error.
pub(crate) fn map_db_error(err: sqlx::Error, context: &str) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => {
            AppError::with_source(ErrorKind::Conflict, format!("{context}: already exists"), err)
        }
        Some(FOREIGN_KEY_VIOLATION) => AppError::with_source(
            ErrorKind::NotFound,
            format!("{context}: referenced record not found"),
            err,
        ),
        _ => AppError::with_source(ErrorKind::Database, context.to_string(), err),
    }
}
