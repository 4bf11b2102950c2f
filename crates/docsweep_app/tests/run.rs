use std::fs;
use std::path::PathBuf;

use docsweep_app::config::load_config;
use docsweep_app::logging::LogDestination;
use docsweep_app::{run, Cli};
use docsweep_core::PipelineConfig;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn missing_config_means_defaults() {
    sweep_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = load_config(&temp.path().join("docsweep.ron")).unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn malformed_config_is_fatal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("docsweep.ron");
    fs::write(&path, "(max_links_per_archive: \"ten\")").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config"));
}

fn write_config(temp: &TempDir) -> PathBuf {
    let base = temp.path().display();
    let path = temp.path().join("docsweep.ron");
    fs::write(
        &path,
        format!(
            r#"(
                root_dir: "{base}/data",
                scratch_dir: "{base}/tmp",
                results_dir: Some("{base}/results"),
                rar_ledger_path: "{base}/processed_rar.ledger",
                zip_ledger_path: "{base}/processed_zip.ledger",
            )"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn empty_root_walks_cleanly_and_creates_the_ledgers() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("data")).unwrap();
    let cli = Cli {
        root: None,
        config: write_config(&temp),
        log: LogDestination::Terminal,
        verbose: false,
    };

    let summary = run(&cli).unwrap();

    assert_eq!(summary, Default::default());
    assert!(temp.path().join("processed_rar.ledger").is_file());
    assert!(temp.path().join("processed_zip.ledger").is_file());
}

#[test]
fn missing_root_aborts_the_run() {
    let temp = TempDir::new().unwrap();
    let cli = Cli {
        root: Some(temp.path().join("nowhere")),
        config: write_config(&temp),
        log: LogDestination::Terminal,
        verbose: false,
    };

    let err = run(&cli).unwrap_err();
    assert!(format!("{err:#}").contains("walk of"));
}
