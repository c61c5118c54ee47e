use std::path::{Path, PathBuf};

use crate::config::Platform;

/// Download URL for a normalized reference.
///
/// Shared assets live under the platform's host-rooted `/static` namespace;
/// everything else is relative to the document's content root.
pub fn resolve(reference: &str, base_url: &str, platform: &Platform) -> String {
    if reference.contains("/static") {
        format!("{}{reference}", platform.origin())
    } else {
        format!("{base_url}{reference}")
    }
}

/// Where a normalized reference is mirrored inside a page directory.
pub fn local_asset_path(page_dir: &Path, reference: &str) -> PathBuf {
    let mut path = page_dir.to_path_buf();
    for segment in reference.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path.push(segment);
    }
    path
}
