//! Artifact storage configuration.

use serde::{Deserialize, Serialize};

/// Storage engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which `deployments/{project}/{hash}` trees live.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    /// Promote the contents of a lone top-level directory to the
    /// deployment root.
    #[serde(default = "default_true")]
    pub flatten_single_root: bool,
    /// Maximum accepted upload body in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Maximum total uncompressed size of one archive.
    #[serde(default = "default_max_extracted")]
    pub max_extracted_bytes: u64,
    /// Maximum number of entries in one archive.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            flatten_single_root: true,
            max_upload_size_bytes: default_max_upload(),
            max_extracted_bytes: default_max_extracted(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_base_dir() -> String {
    "./data/storage".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_upload() -> u64 {
    104_857_600 // 100 MB
}

fn default_max_extracted() -> u64 {
    1_073_741_824 // 1 GB
}

fn default_max_entries() -> usize {
    10_000
}
