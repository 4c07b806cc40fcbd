//! Gzip + tar decoding.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use super::{Budget, ExtractError, ExtractLimits, entry_target};

/// Extract a gzip-compressed tarball read sequentially from `reader`.
///
/// Symlinks and hard links are skipped; only regular files and
/// directories are materialized.
pub fn extract_tar_gz(
    reader: impl Read,
    dest: &Path,
    limits: ExtractLimits,
) -> Result<(), ExtractError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut budget = Budget::new(limits);

    for entry in archive.entries()? {
        let mut entry = entry?;
        budget.admit_entry()?;

        let name = entry.path()?.into_owned();
        let Some(out_path) = entry_target(dest, &name)? else {
            continue;
        };

        match entry.header().entry_type() {
            EntryType::Directory => fs::create_dir_all(&out_path)?,
            EntryType::Regular | EntryType::Continuous => {
                budget.write_file(&mut entry, &out_path)?;
            }
            other => {
                debug!(entry = %name.display(), kind = ?other, "Skipping non-regular tar entry");
            }
        }
    }

    Ok(())
}
