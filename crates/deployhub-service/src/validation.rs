//! Input validation helpers.

use validator::Validate;

use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;

/// Run the derived validators on `input`, mapping failures to
/// [`ErrorKind::Validation`].
pub fn validate<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::with_source(ErrorKind::Validation, format!("Invalid input: {e}"), e))
}

/// Normalize an uploaded entry path.
///
/// Blank input means "serve the artifact root" and yields `None`. Anything
/// else becomes an absolute, slash-separated path with empty and `.`
/// segments dropped; `..`, backslashes and NUL bytes are rejected.
pub fn normalize_entry_path(raw: Option<&str>) -> AppResult<Option<String>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if raw.contains('\\') || raw.contains('\0') {
        return Err(AppError::validation(format!(
            "Entry path '{raw}' contains illegal characters"
        )));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(AppError::validation(format!(
                    "Entry path '{raw}' must not contain '..'"
                )));
            }
            s => segments.push(s),
        }
    }

    Ok(Some(format!("/{}", segments.join("/"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_entry_is_root() {
        assert_eq!(normalize_entry_path(None).unwrap(), None);
        assert_eq!(normalize_entry_path(Some("   ")).unwrap(), None);
    }

    #[test]
    fn test_entry_gets_leading_slash() {
        assert_eq!(
            normalize_entry_path(Some("index.html")).unwrap().as_deref(),
            Some("/index.html")
        );
        assert_eq!(
            normalize_entry_path(Some("./docs//guide/")).unwrap().as_deref(),
            Some("/docs/guide")
        );
        assert_eq!(normalize_entry_path(Some("/")).unwrap().as_deref(), Some("/"));
    }

    #[test]
    fn test_entry_traversal_rejected() {
        let err = normalize_entry_path(Some("/a/../../etc/passwd")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(normalize_entry_path(Some("a\\b")).is_err());
    }
}
