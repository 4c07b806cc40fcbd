//! # deployhub-storage
//!
//! Content-addressable artifact storage. Archives are unpacked into a
//! staging directory next to their final location and renamed into place
//! only once extraction has fully succeeded, so a reader never observes a
//! half-written deployment tree.

pub mod engine;
pub mod extract;
pub mod key;
pub mod path;

pub use engine::ArtifactStore;
pub use extract::{ArchiveFormat, ExtractError, ExtractLimits};
pub use key::ArtifactKey;
