//! Whole-file replacement inside the watched directory.

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use deployhub_core::error::{AppError, ErrorKind};
use deployhub_core::result::AppResult;

/// Write `contents` to `dir/file_name` via a temp file and rename.
///
/// The temp file is a dotfile in the same directory so the rename stays
/// on one filesystem; watchers only ever see the old or the new file.
pub async fn write_atomic(dir: &Path, file_name: &str, contents: &[u8]) -> AppResult<()> {
    fs::create_dir_all(dir).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Gateway,
            format!("Failed to create config directory: {}", dir.display()),
            e,
        )
    })?;

    let final_path = dir.join(file_name);
    let temp_path = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    if let Err(e) = write_synced(&temp_path, contents).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(AppError::with_source(
            ErrorKind::Gateway,
            format!("Failed to write config file: {}", temp_path.display()),
            e,
        ));
    }

    if let Err(e) = fs::rename(&temp_path, &final_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(AppError::with_source(
            ErrorKind::Gateway,
            format!("Failed to replace config file: {}", final_path.display()),
            e,
        ));
    }

    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Delete `path`; a missing file is not an error.
pub async fn remove_if_exists(path: &Path) -> AppResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Gateway,
            format!("Failed to remove config file: {}", path.display()),
            e,
        )),
    }
}
