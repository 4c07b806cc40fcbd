//! Storage addressing.

use std::fmt;

use deployhub_core::error::AppError;
use deployhub_core::result::AppResult;
use deployhub_core::types::ProjectId;
use deployhub_entity::deployment::Deployment;
use deployhub_entity::deployment::model::storage_key;

/// Location of one artifact tree: `deployments/{project_id}/{content_hash}`.
///
/// The content hash must be a single path segment made of lowercase ASCII
/// alphanumerics, `-` and `_`, so the key can never address anything but
/// its own directory and maps to exactly one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    project_id: ProjectId,
    content_hash: String,
    relative: String,
}

impl ArtifactKey {
    /// Build a key, validating the content hash.
    pub fn new(project_id: ProjectId, content_hash: impl Into<String>) -> AppResult<Self> {
        let content_hash = content_hash.into();
        validate_content_hash(&content_hash)?;
        let relative = storage_key(project_id, &content_hash);
        Ok(Self {
            project_id,
            content_hash,
            relative,
        })
    }

    /// Key for an existing deployment record.
    pub fn for_deployment(deployment: &Deployment) -> AppResult<Self> {
        Self::new(deployment.project_id, deployment.content_hash.clone())
    }

    /// Directory holding every artifact of a project, relative to the base.
    pub fn project_dir(project_id: ProjectId) -> String {
        format!("deployments/{project_id}")
    }

    /// Owning project.
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Content hash.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Path relative to the storage base directory.
    pub fn as_str(&self) -> &str {
        &self.relative
    }

    /// Relative path of a file inside the artifact.
    pub fn join(&self, entry_path: &str) -> String {
        format!(
            "{}/{}",
            self.relative,
            entry_path.trim_start_matches(['/', '\\'])
        )
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative)
    }
}

/// Check that a content hash is a safe, non-empty path segment.
pub fn validate_content_hash(hash: &str) -> AppResult<()> {
    if hash.is_empty() {
        return Err(AppError::validation("Content hash must not be empty"));
    }
    if hash.starts_with('-')
        || !hash
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(AppError::validation(format!(
            "Content hash '{hash}' may only contain lowercase ASCII letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployhub_core::error::ErrorKind;

    #[test]
    fn test_key_layout() {
        let project = ProjectId::new();
        let key = ArtifactKey::new(project, "abc123").unwrap();
        assert_eq!(key.as_str(), format!("deployments/{project}/abc123"));
        assert_eq!(
            key.join("/dist/index.html"),
            format!("deployments/{project}/abc123/dist/index.html")
        );
    }

    #[test]
    fn test_rejects_unsafe_hashes() {
        for bad in ["", "..", "a/b", "a.b", "-abc", "abc def", "ABC", "abC1"] {
            let err = ArtifactKey::new(ProjectId::new(), bad).expect_err(bad);
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }
}
