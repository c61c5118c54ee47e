use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = spinegrab::cli::Cli::parse();
    spinegrab::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let work = tokio::task::spawn_blocking(move || run_command(cli.command));

    tokio::select! {
        joined = work => joined.context("spawn_blocking join")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for ctrl-c")?;
            tracing::warn!("interrupted; the current page is left incomplete");
            // The blocking worker cannot be aborted; leave without waiting for it.
            // Its page has no marker yet, so the next run starts that page over.
            std::process::exit(0);
        }
    }
}

fn run_command(command: spinegrab::cli::Command) -> anyhow::Result<()> {
    match command {
        spinegrab::cli::Command::Download(args) => {
            spinegrab::download::run(args).context("download")?;
        }
        spinegrab::cli::Command::Page(args) => {
            let number = args.number;
            if let Some(outcome) = spinegrab::download::page(args).context("page")? {
                println!("page {number}: {outcome:?}");
            }
        }
    }
    Ok(())
}
