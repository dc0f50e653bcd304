mod cli;
mod error;
mod logging;
mod run;

use crate::cli::Cli;
use crate::error::{Error, ErrorKind};
use clap::Parser;
use exn::ResultExt;
use partpush_config::Config;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet).map_err(report)?;
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config).map_err(report)?;

    let mode = cli.mode();
    tracing::debug!(?mode, files = cli.files.len(), "Starting");
    let summary = run::run(mode, Path::new("."), &cli.files, &config).await.map_err(report)?;
    summary.log(mode);
    Ok(())
}

/// Render the whole error tree; `miette` only sees the top-level message
/// otherwise.
fn report(err: Error) -> miette::Report {
    miette::miette!("{err:?}")
}
