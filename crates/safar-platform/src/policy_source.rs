//! Reads the company policy document from disk.

use std::path::Path;

/// Contents of the policy file, or `None` if it cannot be read. A missing
/// document is not fatal: the policy store starts `Empty` and policy
/// questions get the "unavailable" answer.
pub fn read_policy_document(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            log::info!("Loaded policy document {} ({} bytes)", path.display(), text.len());
            Some(text)
        }
        Err(e) => {
            log::warn!("Policy document {} unavailable: {}", path.display(), e);
            None
        }
    }
}
