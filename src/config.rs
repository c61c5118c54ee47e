use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_PLATFORM_URL: &str = "https://platform.virdocs.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub csrftoken: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub total_pages: u32,
}

impl Config {
    /// Reads and validates the config file.
    ///
    /// When the file does not exist a blank template is written in its place and
    /// `None` is returned, so the caller can stop and let the operator fill it in.
    pub fn load_or_init(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            write_template(path)?;
            tracing::info!(
                path = %path.display(),
                "created new config; fill in the fields and re-run"
            );
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("parse config: {}", path.display()))?;
        config.validate()?;

        Ok(Some(config))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("csrftoken", self.csrftoken.as_str()),
            ("session_id", self.session_id.as_str()),
            ("book_id", self.book_id.as_str()),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{field} is unset in the config");
            }
        }
        if self.total_pages == 0 {
            anyhow::bail!("total_pages is unset in the config");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_pairs([
            ("csrftoken", self.csrftoken.as_str()),
            ("session_id", self.session_id.as_str()),
        ])
    }
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create config parent dir: {}", parent.display()))?;
    }
    let template =
        serde_json::to_string_pretty(&Config::default()).context("serialize config template")?;
    std::fs::write(path, format!("{template}\n"))
        .with_context(|| format!("write config template: {}", path.display()))?;
    Ok(())
}

/// Cookie name/value pairs sent with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: BTreeMap<String, String>,
}

impl Credentials {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let cookies = pairs
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Origin that serves both the spine pages and the shared `/static` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    origin: String,
}

impl Platform {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let url = Url::parse(input).with_context(|| format!("parse platform url: {input}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("platform url must be http/https: {url}");
        }
        if url.host_str().is_none() {
            anyhow::bail!("platform url must have host: {url}");
        }
        let origin = url.as_str().trim_end_matches('/').to_owned();
        Ok(Self { origin })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn spine_url(&self, book_id: &str, page_number: u32) -> String {
        format!("{}/spine/{book_id}/{page_number}", self.origin)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            origin: DEFAULT_PLATFORM_URL.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Config {
        Config {
            csrftoken: "csrf".to_owned(),
            session_id: "sess".to_owned(),
            book_id: "1234".to_owned(),
            total_pages: 10,
        }
    }

    #[test]
    fn missing_config_writes_template_and_returns_none() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("config.json");

        assert!(Config::load_or_init(&path)?.is_none());

        let written: Config = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert!(written.csrftoken.is_empty());
        assert_eq!(written.total_pages, 0);
        Ok(())
    }

    #[test]
    fn empty_field_is_named_in_error() {
        let mut config = filled();
        config.book_id = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("book_id"), "{err}");

        let mut config = filled();
        config.total_pages = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("total_pages"), "{err}");
    }

    #[test]
    fn missing_keys_fail_validation() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"csrftoken": "a", "book_id": "b", "total_pages": 3}"#)?;

        let err = Config::load_or_init(&path).unwrap_err();
        assert!(format!("{err:#}").contains("session_id"), "{err:#}");
        Ok(())
    }

    #[test]
    fn cookie_header_is_sorted_by_name() {
        let header = filled().credentials().cookie_header();
        assert_eq!(header, "csrftoken=csrf; session_id=sess");
    }

    #[test]
    fn platform_trims_trailing_slash() -> anyhow::Result<()> {
        let platform = Platform::parse("http://127.0.0.1:8080/")?;
        assert_eq!(platform.origin(), "http://127.0.0.1:8080");
        assert_eq!(
            platform.spine_url("42", 7),
            "http://127.0.0.1:8080/spine/42/7"
        );
        assert!(Platform::parse("ftp://example.com").is_err());
        Ok(())
    }
}
