use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Download(DownloadArgs),
    Page(PageArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Stop at the first page the platform reports as missing.
    UntilNotFound,
    /// Download pages 1..=total_pages from the config.
    PageCount,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Path to the JSON config (created with blank fields if missing).
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Root directory for downloaded pages.
    #[arg(long, default_value = "pages")]
    pub out: String,

    /// Platform origin serving spine pages and `/static` assets.
    #[arg(long, default_value = crate::config::DEFAULT_PLATFORM_URL)]
    pub platform_url: String,

    /// Base delay for exponential request backoff.
    #[arg(long, default_value_t = 1000)]
    pub backoff_ms: u64,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// How the run decides it is finished.
    #[arg(long, value_enum, default_value_t = Mode::UntilNotFound)]
    pub mode: Mode,

    /// First page number to fetch.
    #[arg(long, default_value_t = 1)]
    pub start_page: u32,

    /// Delay between page-level retries in page-count mode.
    #[arg(long, default_value_t = 5000)]
    pub strike_delay_ms: u64,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Page number to fetch.
    #[arg(long)]
    pub number: u32,
}
