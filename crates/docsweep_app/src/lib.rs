//! Command-line front end: configuration loading, logging setup and one walk.
pub mod config;
pub mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docsweep_engine::{Pipeline, RunSummary};

use crate::logging::LogDestination;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "docsweep",
    about = "Pull document text out of links in archived HTML pages and pack it back into the archives"
)]
pub struct Cli {
    /// Directory holding the .rar and .zip files; overrides `root_dir` from the config
    pub root: Option<PathBuf>,

    /// Configuration file; defaults apply when it does not exist
    #[arg(long, default_value = config::CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Where log lines go
    #[arg(long, value_enum, default_value_t = LogDestination::Both)]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Loads the configuration and walks the root once.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(root) = &cli.root {
        config.root_dir = root.clone();
    }
    let root = config.root_dir.clone();

    let mut pipeline = Pipeline::new(config).context("failed to start the pipeline")?;
    pipeline
        .walk(&root)
        .with_context(|| format!("walk of {} aborted", root.display()))
}
