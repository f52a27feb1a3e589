use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sharesleuth", version)]
#[command(about = "Pre-migration file-share analyser", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Log per-batch detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the configured keyword file
    #[arg(long, global = true, value_name = "FILE")]
    pub keywords: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Ignore reusable scan output
    #[arg(long, global = true)]
    pub force_rescan: bool,

    /// Restart interrupted scans from scratch
    #[arg(long, global = true)]
    pub no_resume: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan (or reuse), back-fill permissions, classify and write issues
    Run,
    /// Scan and back-fill only
    Scan,
    /// Classify existing scan output
    Classify,
    /// Show the checkpoint and what the next run would do
    Status {
        /// Print the checkpoint document as JSON
        #[arg(long)]
        json: bool,
    },
}
