//! Archive decoding into a directory tree.
//!
//! Both decoders run on blocking threads and write beneath a caller-owned
//! destination directory. Every entry name is normalized before it touches
//! the filesystem; anything that would land outside the destination aborts
//! the whole extraction.

pub mod tar_gz;
pub mod zip;

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use deployhub_core::config::StorageConfig;
use deployhub_core::error::{AppError, ErrorKind};

use crate::path::normalize_entry;

/// Copy buffer size for entry bodies.
const BUFFER_SIZE: usize = 64 * 1024;

/// Archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// Zip archive (everything else).
    Zip,
}

impl ArchiveFormat {
    /// Pick the decoder from the uploaded file name.
    pub fn detect(archive_name: &str) -> Self {
        let lower = archive_name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else {
            Self::Zip
        }
    }
}

/// Resource limits applied while extracting one archive.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum total bytes written.
    pub max_bytes: u64,
}

impl From<&StorageConfig> for ExtractLimits {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            max_bytes: config.max_extracted_bytes,
        }
    }
}

/// Extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// An entry would be written outside the destination.
    #[error("Archive entry '{entry}' escapes the extraction directory")]
    PathTraversal {
        /// Raw entry name.
        entry: String,
    },

    /// The archive has more entries than allowed.
    #[error("Archive has more than {limit} entries")]
    TooManyEntries {
        /// Configured limit.
        limit: usize,
    },

    /// The extracted content exceeds the size budget.
    #[error("Extracted content exceeds {limit} bytes")]
    SizeExceeded {
        /// Configured limit.
        limit: u64,
    },

    /// Filesystem or decoder I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed zip archive.
    #[error("Zip error: {0}")]
    Zip(#[from] ::zip::result::ZipError),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::PathTraversal { .. } => {
                AppError::new(ErrorKind::PathTraversal, err.to_string())
            }
            other => AppError::with_source(
                ErrorKind::Storage,
                format!("Archive extraction failed: {other}"),
                other,
            ),
        }
    }
}

/// Running totals checked against [`ExtractLimits`].
#[derive(Debug)]
pub(crate) struct Budget {
    limits: ExtractLimits,
    entries: usize,
    bytes: u64,
}

impl Budget {
    pub(crate) fn new(limits: ExtractLimits) -> Self {
        Self {
            limits,
            entries: 0,
            bytes: 0,
        }
    }

    /// Count one more entry.
    pub(crate) fn admit_entry(&mut self) -> Result<(), ExtractError> {
        self.entries += 1;
        if self.entries > self.limits.max_entries {
            return Err(ExtractError::TooManyEntries {
                limit: self.limits.max_entries,
            });
        }
        Ok(())
    }

    /// Stream `reader` into a new file at `out_path`, charging every byte.
    pub(crate) fn write_file(
        &mut self,
        reader: &mut impl Read,
        out_path: &Path,
    ) -> Result<(), ExtractError> {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(out_path)?;
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            self.bytes += n as u64;
            if self.bytes > self.limits.max_bytes {
                return Err(ExtractError::SizeExceeded {
                    limit: self.limits.max_bytes,
                });
            }
            outfile.write_all(&buffer[..n])?;
        }
        outfile.flush()?;
        Ok(())
    }
}

/// Map an entry name to its output path under `dest`.
///
/// `Ok(None)` means the entry names the destination root and carries
/// nothing to write.
pub(crate) fn entry_target(dest: &Path, name: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let relative = normalize_entry(name).ok_or_else(|| ExtractError::PathTraversal {
        entry: name.display().to_string(),
    })?;
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(dest.join(relative)))
}
