//! ShareSleuth — pre-migration file-share analyser.
//!
//! Thin binary entry point. All logic lives in the `sharesleuth-core`
//! and `sharesleuth-cli` crates.

use clap::Parser;
use sharesleuth_cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("ShareSleuth starting");

    sharesleuth_cli::run(cli)
}
