//! Lexical path checks for archive entries and storage lookups.

use std::path::{Component, Path, PathBuf};

/// Normalize an archive entry name into a relative path.
///
/// Returns `None` when the entry would resolve outside the extraction
/// root: any `..` component, an absolute path, or a drive prefix. `.`
/// components are dropped. An empty result means the entry names the
/// root itself.
pub fn normalize_entry(name: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Resolve a storage-relative path such as `deployments/p/h/index.html`.
///
/// Leading slashes are ignored so entry paths like `/index.html` can be
/// appended to a key directly. `..` and drive prefixes are rejected.
pub fn resolve_relative(base: &Path, path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches(['/', '\\']);
    let relative = normalize_entry(Path::new(trimmed))?;
    Some(base.join(relative))
}
