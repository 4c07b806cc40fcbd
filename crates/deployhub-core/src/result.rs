//! Convenience result type alias for DeployHub.

use crate::error::AppError;

/// A specialized `Result` type for DeployHub operations.
pub type AppResult<T> = Result<T, AppError>;
