use std::time::Duration;

use anyhow::Context as _;

use crate::pipeline::{PageDownloader, PageOutcome};

/// Extra attempts per page in page-count mode.
pub const PAGE_STRIKES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Keep going until the platform reports a missing page.
    UntilNotFound,
    /// Walk `start..=total_pages`, skipping pages that cannot be fetched.
    PageCount { total_pages: u32 },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub start_page: u32,
    pub termination: Termination,
    pub strike_delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// First page that answered 404 in until-not-found mode.
    pub stopped_at: Option<u32>,
}

pub fn run(downloader: &PageDownloader, options: &RunOptions) -> anyhow::Result<RunSummary> {
    let book_dir = downloader.book_dir();
    std::fs::create_dir_all(book_dir)
        .with_context(|| format!("create book dir: {}", book_dir.display()))?;

    let mut summary = RunSummary::default();
    let mut page_number = options.start_page.max(1);
    loop {
        if let Termination::PageCount { total_pages } = options.termination
            && page_number > total_pages
        {
            break;
        }

        let outcome = match options.termination {
            Termination::UntilNotFound => attempt_page(downloader, page_number),
            Termination::PageCount { .. } => {
                attempt_page_with_strikes(downloader, page_number, options)
            }
        };

        match outcome {
            Some(PageOutcome::Completed { .. }) => summary.completed += 1,
            Some(PageOutcome::Skipped) => summary.skipped += 1,
            Some(PageOutcome::NotFound) => {
                if options.termination == Termination::UntilNotFound {
                    summary.stopped_at = Some(page_number);
                    break;
                }
                summary.failed += 1;
            }
            Some(PageOutcome::RetriesExhausted { .. }) | None => summary.failed += 1,
        }

        page_number = match page_number.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    tracing::info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        stopped_at = ?summary.stopped_at,
        "finished downloading pages"
    );
    Ok(summary)
}

/// Page-level errors end here; they never stop the run.
fn attempt_page(downloader: &PageDownloader, page_number: u32) -> Option<PageOutcome> {
    match downloader.download_page(page_number) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            tracing::error!(page = page_number, err = %format!("{err:#}"), "page failed");
            None
        }
    }
}

/// Re-attempts a page only when it ended as `RetriesExhausted`. A 404 or a
/// page-level error is returned after the first attempt.
fn attempt_page_with_strikes(
    downloader: &PageDownloader,
    page_number: u32,
    options: &RunOptions,
) -> Option<PageOutcome> {
    let mut strikes = 0;
    loop {
        let outcome = attempt_page(downloader, page_number);
        let retryable = matches!(outcome, Some(PageOutcome::RetriesExhausted { .. }));
        if !retryable || strikes >= PAGE_STRIKES {
            if retryable {
                tracing::warn!(page = page_number, strikes, "giving up on page");
            }
            return outcome;
        }

        strikes += 1;
        tracing::info!(
            page = page_number,
            strike = strikes,
            delay_ms = options.strike_delay.as_millis() as u64,
            "retrying page"
        );
        std::thread::sleep(options.strike_delay);
    }
}
