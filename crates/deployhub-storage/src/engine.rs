//! Storage engine.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, info, warn};
use uuid::Uuid;

use deployhub_core::config::StorageConfig;
use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;
use deployhub_core::traits::storage::ByteStream;

use crate::extract::{ArchiveFormat, ExtractLimits, tar_gz, zip};
use crate::key::ArtifactKey;
use crate::path::resolve_relative;

/// Filesystem-backed, content-addressable artifact store.
///
/// Each artifact is unpacked once into `{base_dir}/{key}`. The final
/// directory is either absent or complete: extraction happens in a
/// uniquely named sibling (`{hash}_tmp.{uuid}`) that is renamed into place
/// atomically and purged on any failure.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base: PathBuf,
    limits: ExtractLimits,
    flatten_single_root: bool,
}

impl ArtifactStore {
    /// Create a store rooted at `config.base_dir`, creating the directory.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let base = PathBuf::from(&config.base_dir);
        fs::create_dir_all(&base).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", base.display()),
                e,
            )
        })?;
        Ok(Self {
            base,
            limits: ExtractLimits::from(config),
            flatten_single_root: config.flatten_single_root,
        })
    }

    /// Storage base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Absolute directory of an artifact.
    pub fn artifact_dir(&self, key: &ArtifactKey) -> PathBuf {
        self.base.join(key.as_str())
    }

    /// Whether the base directory is usable.
    pub async fn health_check(&self) -> bool {
        fs::metadata(&self.base)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Unpack `stream` under `key`.
    ///
    /// Returns `Ok(false)` without reading the stream when the key is
    /// already populated, `Ok(true)` once a fresh tree has been renamed
    /// into place.
    pub async fn store(
        &self,
        key: &ArtifactKey,
        archive_name: &str,
        stream: ByteStream,
    ) -> AppResult<bool> {
        let final_path = self.artifact_dir(key);
        if path_exists(&final_path).await {
            debug!(key = %key, "Artifact already stored, skipping extraction");
            return Ok(false);
        }

        let parent = final_path
            .parent()
            .ok_or_else(|| AppError::storage(format!("Storage key has no parent: {key}")))?;
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create directory: {}", parent.display()),
                e,
            )
        })?;

        let staging = parent.join(format!(
            "{}_tmp.{}",
            key.content_hash(),
            Uuid::new_v4().simple()
        ));
        let format = ArchiveFormat::detect(archive_name);

        if let Err(e) = self.extract_into(format, stream, &staging).await {
            purge(&staging).await;
            warn!(key = %key, error = %e, "Artifact extraction failed");
            return Err(e);
        }

        let source = if self.flatten_single_root {
            single_root_dir(&staging)
                .await
                .unwrap_or_else(|| staging.clone())
        } else {
            staging.clone()
        };

        match fs::rename(&source, &final_path).await {
            Ok(()) => {
                if source != staging {
                    purge(&staging).await;
                }
                info!(key = %key, format = ?format, "Artifact stored");
                Ok(true)
            }
            Err(e) => {
                purge(&staging).await;
                if path_exists(&final_path).await {
                    // A concurrent upload of the same key won the rename.
                    debug!(key = %key, "Artifact stored concurrently");
                    return Ok(false);
                }
                Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to move artifact into place: {key}"),
                    e,
                ))
            }
        }
    }

    /// Whether `path` (relative to the base directory) exists as a file or
    /// directory. Never fails; unsafe paths report `false`.
    pub async fn exists(&self, path: &str) -> bool {
        match resolve_relative(&self.base, path) {
            Some(full) => path_exists(&full).await,
            None => false,
        }
    }

    /// Recursively remove `path`. An absent path is not an error.
    pub async fn remove(&self, path: &str) -> AppResult<()> {
        let full = resolve_relative(&self.base, path)
            .ok_or_else(|| AppError::path_traversal(format!("Refusing to remove '{path}'")))?;
        if full == self.base {
            return Err(AppError::path_traversal("Refusing to remove the storage root"));
        }

        let metadata = match fs::symlink_metadata(&full).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat: {path}"),
                    e,
                ));
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&full).await
        } else {
            fs::remove_file(&full).await
        };

        match result {
            Ok(()) => {
                debug!(path, "Removed storage path");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove: {path}"),
                e,
            )),
        }
    }

    async fn extract_into(
        &self,
        format: ArchiveFormat,
        stream: ByteStream,
        staging: &Path,
    ) -> AppResult<()> {
        fs::create_dir_all(staging).await?;
        let dest = staging.to_path_buf();
        let limits = self.limits;
        let mut reader = StreamReader::new(stream);

        let outcome = match format {
            ArchiveFormat::TarGz => {
                let bridge = SyncIoBridge::new(reader);
                tokio::task::spawn_blocking(move || tar_gz::extract_tar_gz(bridge, &dest, limits))
                    .await
            }
            ArchiveFormat::Zip => {
                let mut buffer = fs::File::from_std(tempfile::tempfile()?);
                tokio::io::copy(&mut reader, &mut buffer).await?;
                buffer.flush().await?;
                buffer.seek(SeekFrom::Start(0)).await?;
                let file = buffer.into_std().await;
                tokio::task::spawn_blocking(move || zip::extract_zip(file, &dest, limits)).await
            }
        };

        outcome
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Extraction task failed", e))?
            .map_err(AppError::from)
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// The lone top-level directory of `dir`, if that is all it contains.
async fn single_root_dir(dir: &Path) -> Option<PathBuf> {
    let mut entries = fs::read_dir(dir).await.ok()?;
    let first = entries.next_entry().await.ok()??;
    if entries.next_entry().await.ok()?.is_some() {
        return None;
    }
    let file_type = first.file_type().await.ok()?;
    file_type.is_dir().then(|| first.path())
}

async fn purge(path: &Path) {
    match fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to purge staging directory"),
    }
}
