//! Deployment lifecycle defaults.

use serde::{Deserialize, Serialize};

/// Defaults applied to newly uploaded deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Days until a new deployment expires. `0` means never.
    #[serde(default = "default_ttl_days")]
    pub default_ttl_days: u32,
    /// Maximum length accepted for a content hash.
    #[serde(default = "default_max_hash_len")]
    pub max_content_hash_length: usize,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            default_ttl_days: default_ttl_days(),
            max_content_hash_length: default_max_hash_len(),
        }
    }
}

fn default_ttl_days() -> u32 {
    30
}

fn default_max_hash_len() -> usize {
    128
}
