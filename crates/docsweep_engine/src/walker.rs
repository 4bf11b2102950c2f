use std::fs;
use std::path::{Path, PathBuf};

use docsweep_core::{ArchiveKind, ArchiveRef};
use sweep_logging::{sweep_debug, sweep_info, sweep_warn};
use walkdir::WalkDir;

use crate::ledger::LedgerScope;
use crate::pipeline::{Pipeline, PipelineError};
use crate::types::{RarOutcome, RunSummary, ZipOutcome};

impl Pipeline {
    /// Processes every `.rar` and `.zip` under `root`.
    ///
    /// The file list is taken before any archive is touched. Scratch and
    /// results directories are never entered.
    pub fn walk(&mut self, root: &Path) -> Result<RunSummary, PipelineError> {
        sweep_info!("Walking {:?}", root);
        let archives = self.discover(root)?;
        let mut summary = RunSummary::default();

        for archive in archives {
            match archive.kind {
                ArchiveKind::Rar => self.walk_rar(&archive, &mut summary)?,
                ArchiveKind::Zip => {
                    let outcome = self.process_zip(&archive)?;
                    summary.absorb_zip(&outcome);
                }
            }
        }

        sweep_info!(
            "Run finished: rar {} done / {} skipped / {} failed, zip {} done / {} skipped / {} failed, {} fetches, {} documents",
            summary.rars_completed,
            summary.rars_skipped,
            summary.rars_failed,
            summary.zips_completed,
            summary.zips_skipped,
            summary.zips_failed,
            summary.fetch_attempts,
            summary.documents_staged
        );
        Ok(summary)
    }

    fn walk_rar(
        &mut self,
        archive: &ArchiveRef,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        if self.ledger.contains(LedgerScope::Rar, &archive.ledger_key) {
            sweep_debug!("Skipping {}: already processed", archive);
            summary.rars_skipped += 1;
            return Ok(());
        }
        match self.process_rar(archive)? {
            RarOutcome::Completed { zips } => {
                for (_, outcome) in &zips {
                    summary.absorb_zip(outcome);
                }
                // A RAR is only done once every ZIP inside it is; otherwise the
                // next run unpacks it again and retries the failed ones.
                let failed = zips
                    .iter()
                    .filter(|(_, outcome)| matches!(outcome, ZipOutcome::Failed(_)))
                    .count();
                if failed > 0 {
                    sweep_warn!(
                        "Not recording {}: {} of its {} zips failed",
                        archive,
                        failed,
                        zips.len()
                    );
                    summary.rars_failed += 1;
                } else {
                    self.ledger.record(LedgerScope::Rar, &archive.ledger_key)?;
                    summary.rars_completed += 1;
                }
            }
            RarOutcome::Failed(err) => {
                sweep_warn!("Giving up on {}: {}", archive, err);
                summary.rars_failed += 1;
            }
        }
        Ok(())
    }

    fn discover(&self, root: &Path) -> Result<Vec<ArchiveRef>, PipelineError> {
        let excluded: Vec<PathBuf> = std::iter::once(&self.config.scratch_dir)
            .chain(self.config.results_dir.as_ref())
            .filter_map(|dir| fs::canonicalize(dir).ok())
            .collect();
        let is_excluded = |path: &Path| {
            !excluded.is_empty()
                && fs::canonicalize(path).is_ok_and(|real| excluded.iter().any(|ex| *ex == real))
        };

        let mut archives = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && is_excluded(entry.path())));
        for entry in walker {
            let entry = entry.map_err(|source| PipelineError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(kind) = ArchiveKind::from_path(entry.path()) {
                archives.push(ArchiveRef::discovered(entry.into_path(), kind));
            }
        }
        sweep_info!("Found {} archives under {:?}", archives.len(), root);
        Ok(archives)
    }
}
