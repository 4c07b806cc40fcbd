//! Typed path parameter helpers.

use std::str::FromStr;

use deployhub_core::error::AppError;

/// Parses a typed id from a path or query segment.
pub fn parse_id<T: FromStr>(s: &str) -> Result<T, AppError> {
    s.parse::<T>()
        .map_err(|_| AppError::validation(format!("Invalid id: {s}")))
}
