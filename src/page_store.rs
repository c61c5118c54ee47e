use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::resolve::local_asset_path;

pub fn book_dir(pages_root: &Path, book_id: &str) -> PathBuf {
    pages_root.join(book_id)
}

pub fn page_dir(book_dir: &Path, page_number: u32) -> PathBuf {
    book_dir.join(page_number.to_string())
}

/// The completion marker of a page.
pub fn index_html_path(page_dir: &Path) -> PathBuf {
    page_dir.join("html").join("index.html")
}

pub fn is_complete(page_dir: &Path) -> bool {
    index_html_path(page_dir).is_file()
}

pub fn write_asset(page_dir: &Path, reference: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let path = local_asset_path(page_dir, reference);
    if path == page_dir {
        anyhow::bail!("asset reference has no file component: {reference}");
    }
    write_with_parents(&path, bytes).context("write asset")?;
    Ok(path)
}

/// Writes the final markup, which also marks the page as complete.
///
/// The markup goes to a sibling file first and is renamed into place, so an
/// interrupted write never leaves a truncated marker behind.
pub fn write_index(page_dir: &Path, html: &str) -> anyhow::Result<PathBuf> {
    let path = index_html_path(page_dir);
    let tmp_path = path.with_extension("html.partial");
    write_with_parents(&tmp_path, html.as_bytes()).context("write index html")?;
    std::fs::rename(&tmp_path, &path)
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(path)
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path must have parent: {}", path.display()))?;
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("create parent dir: {}", parent_dir.display()))?;
    std::fs::write(path, bytes).with_context(|| format!("write file: {}", path.display()))?;
    Ok(())
}
