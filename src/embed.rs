use std::path::Path;
use std::sync::LazyLock;

use base64::Engine as _;
use regex::{Captures, Regex};

use crate::markup::normalize_reference;
use crate::resolve::local_asset_path;

static SRC_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(.*?)""#).expect("src attribute regex"));

/// Rewrites every `src="..."` whose target was downloaded into `page_dir` as an
/// inline `data:image/png;base64,...` URI. Targets that cannot be read are left
/// as they were.
pub fn embed_images(page_dir: &Path, html: &str) -> String {
    SRC_ATTR
        .replace_all(html, |caps: &Captures<'_>| {
            let original = &caps[0];
            let target = &caps[1];
            if target.starts_with("data:") {
                return original.to_owned();
            }

            let path = local_asset_path(page_dir, &normalize_reference(target));
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                    format!(r#"src="data:image/png;base64,{encoded}""#)
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "image not found; keeping src");
                    original.to_owned()
                }
            }
        })
        .into_owned()
}
