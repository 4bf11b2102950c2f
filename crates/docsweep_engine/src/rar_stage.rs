use std::io;
use std::path::{Path, PathBuf};

use docsweep_core::{ArchiveKind, ArchiveRef};
use sweep_logging::{sweep_error, sweep_info};
use walkdir::WalkDir;

use crate::archive::ArchiveError;
use crate::pipeline::{Pipeline, PipelineError};
use crate::types::RarOutcome;

impl Pipeline {
    /// Unpacks a RAR into scratch and runs the ZIP stage on every ZIP inside.
    ///
    /// Does not touch the RAR-scope ledger; the walker records the RAR once
    /// this returns `Completed` with no failed ZIP in it.
    pub fn process_rar(&mut self, archive: &ArchiveRef) -> Result<RarOutcome, PipelineError> {
        sweep_info!("Processing rar {}", archive);
        let scratch = match self.scratch.acquire() {
            Ok(scratch) => scratch,
            Err(err) => {
                sweep_error!("No scratch area for {}: {}", archive, err);
                return Ok(RarOutcome::Failed(err.into()));
            }
        };
        if let Err(err) = self.unpacker.unpack(&archive.path, scratch.path()) {
            sweep_error!("Cannot unpack {}: {}", archive, err);
            return Ok(RarOutcome::Failed(err));
        }

        let nested = match nested_zips(scratch.path()) {
            Ok(nested) => nested,
            Err(err) => {
                sweep_error!("Cannot list unpacked {}: {}", archive, err);
                return Ok(RarOutcome::Failed(err));
            }
        };
        sweep_info!("{} holds {} zip archives", archive, nested.len());

        let export_root = archive
            .path
            .file_stem()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rar"));
        let mut zips = Vec::with_capacity(nested.len());
        for path in nested {
            let relative = path
                .strip_prefix(scratch.path())
                .unwrap_or(&path)
                .to_path_buf();
            let zip = ArchiveRef::nested_zip(archive, &path, &relative);
            let outcome = self.process_zip_exporting(&zip, Some(&export_root.join(&relative)))?;
            zips.push((zip.ledger_key, outcome));
        }
        Ok(RarOutcome::Completed { zips })
    }
}

fn nested_zips(root: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file()
            && ArchiveKind::from_path(entry.path()) == Some(ArchiveKind::Zip)
        {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
