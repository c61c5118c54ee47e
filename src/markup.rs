//! Regex-level analysis of spine markup.
//!
//! Only four constructs are recognized: the `<base>` tag, `<link href>`,
//! `<img src>` and `<script>` blocks. Nothing here is a general HTML parser.

use std::sync::LazyLock;

use regex::Regex;

static BASE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<base\b[^>]*?\bhref="([^"]*?/(?:EPUB|OPS|OEBPS))(?:/[^"]*)?""#)
        .expect("base href regex")
});
static LINK_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link.*?href="(.*?)""#).expect("link href regex"));
static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img.*?src="(.*?)""#).expect("img src regex"));
static BASE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<base\b[^>]*>").expect("base tag regex"));
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*?/>|<script\b[^>]*>.*?</script\s*>").expect("script regex")
});

/// Content root of the document, e.g. `https://host/book/42/EPUB`.
pub fn extract_base_url(html: &str) -> anyhow::Result<String> {
    let captures = BASE_HREF.captures(html).ok_or_else(|| {
        anyhow::anyhow!("markup has no <base href> pointing into an EPUB/OPS/OEBPS root")
    })?;
    Ok(captures[1].to_owned())
}

/// Stylesheet hrefs followed by image srcs, each in document order, normalized.
pub fn extract_references(html: &str) -> Vec<String> {
    let links = LINK_HREF.captures_iter(html).map(|c| c[1].to_owned());
    let images = IMG_SRC.captures_iter(html).map(|c| c[1].to_owned());
    links
        .chain(images)
        .map(|raw| normalize_reference(&raw))
        .collect()
}

/// Drops `..` segments and guarantees a leading `/`.
pub fn normalize_reference(raw: &str) -> String {
    let joined = raw
        .split('/')
        .filter(|segment| *segment != "..")
        .collect::<Vec<_>>()
        .join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Removes `<base>` tags and script blocks so the page renders offline.
pub fn sanitize(html: &str) -> String {
    let without_base = BASE_TAG.replace_all(html, "");
    SCRIPT_BLOCK.replace_all(&without_base, "").into_owned()
}
