use anyhow::Result;
use clap::Parser;
use docsweep_app::{logging, run, Cli};
use log::LevelFilter;
use sweep_logging::sweep_info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(cli.log, level);

    let summary = run(&cli)?;
    sweep_info!(
        "Done: {} archives processed, {} already done, {} failed; {} documents packed",
        summary.rars_completed + summary.zips_completed,
        summary.rars_skipped + summary.zips_skipped,
        summary.rars_failed + summary.zips_failed,
        summary.documents_staged
    );
    Ok(())
}
