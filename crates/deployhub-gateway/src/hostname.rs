//! Hostname and public URL construction.

pub use deployhub_entity::project::dns_label;

/// `{content_hash}.{project}.{domain}`. Content hashes are stored
/// lowercase, so the hash is used verbatim.
pub fn hostname(content_hash: &str, project_name: &str, domain: &str) -> String {
    format!("{content_hash}.{}.{domain}", dns_label(project_name))
}

/// Public URL of a ready deployment.
pub fn public_url(scheme: &str, content_hash: &str, project_name: &str, domain: &str) -> String {
    format!("{scheme}://{}", hostname(content_hash, project_name, domain))
}
