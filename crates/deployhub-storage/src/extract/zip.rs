//! Zip decoding.

use std::fs;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use super::{Budget, ExtractError, ExtractLimits, entry_target};

/// Extract a zip archive. Zip needs random access, so `reader` must be
/// seekable (the engine buffers uploads to a temp file first).
pub fn extract_zip(
    reader: impl Read + Seek,
    dest: &Path,
    limits: ExtractLimits,
) -> Result<(), ExtractError> {
    let mut archive = ZipArchive::new(reader)?;

    if archive.len() > limits.max_entries {
        return Err(ExtractError::TooManyEntries {
            limit: limits.max_entries,
        });
    }

    let mut budget = Budget::new(limits);
    for i in 0..archive.len() {
        let mut zip_file = archive.by_index(i)?;
        budget.admit_entry()?;

        let enclosed = zip_file
            .enclosed_name()
            .ok_or_else(|| ExtractError::PathTraversal {
                entry: zip_file.name().to_string(),
            })?;
        let Some(out_path) = entry_target(dest, &enclosed)? else {
            continue;
        };

        if zip_file.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            budget.write_file(&mut zip_file, &out_path)?;
        }
    }

    Ok(())
}
