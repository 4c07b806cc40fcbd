//! Project host labels.

/// Reduce a project name to a DNS label: lowercase ASCII alphanumerics
/// with single `-` separators, at most 63 characters.
///
/// Every hostname of a project embeds this label, so it is stored as the
/// project's unique `slug`.
pub fn dns_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !label.is_empty() {
                label.push('-');
            }
            pending_dash = false;
            label.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    label.truncate(63);
    let trimmed = label.trim_end_matches('-').len();
    label.truncate(trimmed);
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_label() {
        assert_eq!(dns_label("My Site"), "my-site");
        assert_eq!(dns_label("my_site"), "my-site");
        assert_eq!(dns_label("  docs__v2!! "), "docs-v2");
        assert_eq!(dns_label("already-ok"), "already-ok");
        assert_eq!(dns_label(&"a".repeat(80)).len(), 63);
    }
}
