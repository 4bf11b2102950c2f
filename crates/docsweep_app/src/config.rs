use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use docsweep_core::PipelineConfig;
use sweep_logging::sweep_info;

pub const CONFIG_FILENAME: &str = "docsweep.ron";

/// Reads a RON `PipelineConfig`. Fields left out keep their defaults; a
/// missing file means all defaults. A file that does not parse is an error.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            sweep_info!("No config at {:?}; using defaults", path);
            return Ok(PipelineConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };

    let config: PipelineConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    sweep_info!("Loaded config from {:?}", path);
    Ok(config)
}
