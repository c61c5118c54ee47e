use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::{DownloadArgs, Mode, PageArgs, SourceArgs};
use crate::config::{Config, Platform};
use crate::pipeline::{PageDownloader, PageOutcome};
use crate::run::{RunOptions, RunSummary, Termination};
use crate::transport::{RetryPolicy, Transport};

/// `None` when a fresh config template had to be written first.
fn prepare(source: &SourceArgs) -> anyhow::Result<Option<(Config, PageDownloader)>> {
    let config_path = PathBuf::from(&source.config);
    let Some(config) = Config::load_or_init(&config_path).context("load config")? else {
        return Ok(None);
    };

    let platform = Platform::parse(&source.platform_url).context("parse --platform-url")?;
    let transport = Transport::new(RetryPolicy {
        backoff_base: Duration::from_millis(source.backoff_ms),
        ..RetryPolicy::default()
    })?;
    let downloader = PageDownloader::new(
        config.book_id.clone(),
        config.credentials(),
        platform,
        &PathBuf::from(&source.out),
        transport,
    );

    Ok(Some((config, downloader)))
}

pub fn run(args: DownloadArgs) -> anyhow::Result<Option<RunSummary>> {
    let Some((config, downloader)) = prepare(&args.source)? else {
        return Ok(None);
    };

    let termination = match args.mode {
        Mode::UntilNotFound => Termination::UntilNotFound,
        Mode::PageCount => Termination::PageCount {
            total_pages: config.total_pages,
        },
    };
    let options = RunOptions {
        start_page: args.start_page,
        termination,
        strike_delay: Duration::from_millis(args.strike_delay_ms),
    };

    tracing::info!(
        book = %config.book_id,
        out = %downloader.book_dir().display(),
        ?termination,
        "starting download"
    );
    let summary = crate::run::run(&downloader, &options).context("download pages")?;
    Ok(Some(summary))
}

pub fn page(args: PageArgs) -> anyhow::Result<Option<PageOutcome>> {
    let Some((_, downloader)) = prepare(&args.source)? else {
        return Ok(None);
    };
    let outcome = downloader
        .download_page(args.number)
        .with_context(|| format!("download page {}", args.number))?;
    Ok(Some(outcome))
}
