use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::{Credentials, Platform};
use crate::transport::Transport;
use crate::{embed, markup, page_store, resolve};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The completion marker already existed; nothing was fetched.
    Skipped,
    Completed {
        assets_saved: usize,
        assets_failed: usize,
    },
    /// The platform answered 404: the spine has no more pages.
    NotFound,
    /// The markup request kept failing. `status` is `None` when no response
    /// was ever received.
    RetriesExhausted { status: Option<u16> },
}

/// Downloads single spine pages of one book into `pages_root/{book_id}/{n}`.
#[derive(Debug)]
pub struct PageDownloader {
    book_id: String,
    credentials: Credentials,
    platform: Platform,
    book_dir: PathBuf,
    transport: Transport,
}

impl PageDownloader {
    pub fn new(
        book_id: impl Into<String>,
        credentials: Credentials,
        platform: Platform,
        pages_root: &Path,
        transport: Transport,
    ) -> Self {
        let book_id = book_id.into();
        let book_dir = page_store::book_dir(pages_root, &book_id);
        Self {
            book_id,
            credentials,
            platform,
            book_dir,
            transport,
        }
    }

    pub fn book_dir(&self) -> &Path {
        &self.book_dir
    }

    pub fn download_page(&self, page_number: u32) -> anyhow::Result<PageOutcome> {
        let page_dir = page_store::page_dir(&self.book_dir, page_number);
        if page_store::is_complete(&page_dir) {
            tracing::info!(page = page_number, "already downloaded; skipping");
            return Ok(PageOutcome::Skipped);
        }

        let spine_url = self.platform.spine_url(&self.book_id, page_number);
        let response = match self.transport.fetch(&spine_url, &self.credentials) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    page = page_number,
                    err = %format!("{err:#}"),
                    "page request failed; skipping"
                );
                return Ok(PageOutcome::RetriesExhausted { status: None });
            }
        };
        if response.status == 404 {
            tracing::info!(page = page_number, "page does not exist");
            return Ok(PageOutcome::NotFound);
        }
        if !response.is_success() {
            tracing::warn!(
                page = page_number,
                status = response.status,
                "failed to download page after retries; skipping"
            );
            return Ok(PageOutcome::RetriesExhausted {
                status: Some(response.status),
            });
        }

        let raw = response.text();
        let base_url = markup::extract_base_url(&raw)
            .with_context(|| format!("page {page_number}: locate content root"))?;
        let references = markup::extract_references(&raw);
        tracing::debug!(page = page_number, %base_url, assets = references.len(), "parsed page");

        std::fs::create_dir_all(&page_dir)
            .with_context(|| format!("create page dir: {}", page_dir.display()))?;

        let mut assets_saved = 0_usize;
        let mut assets_failed = 0_usize;
        for reference in &references {
            match self.download_asset(&page_dir, reference, &base_url) {
                Ok(()) => assets_saved += 1,
                Err(err) => {
                    assets_failed += 1;
                    tracing::warn!(
                        page = page_number,
                        %reference,
                        err = %format!("{err:#}"),
                        "asset download failed; continuing"
                    );
                }
            }
        }

        let html = embed::embed_images(&page_dir, &markup::sanitize(&raw));
        page_store::write_index(&page_dir, &html)
            .with_context(|| format!("page {page_number}: persist markup"))?;

        tracing::info!(page = page_number, assets_saved, assets_failed, "page downloaded");
        Ok(PageOutcome::Completed {
            assets_saved,
            assets_failed,
        })
    }

    fn download_asset(
        &self,
        page_dir: &Path,
        reference: &str,
        base_url: &str,
    ) -> anyhow::Result<()> {
        let asset_url = resolve::resolve(reference, base_url, &self.platform);
        let response = self.transport.fetch(&asset_url, &self.credentials)?;
        if !response.is_success() {
            anyhow::bail!("GET {asset_url} returned {}", response.status);
        }
        page_store::write_asset(page_dir, reference, &response.bytes)?;
        Ok(())
    }
}
