//! One pass over a ZIP: select links from its HTML, fetch and extract the
//! documents, commit the text back into the archive, then record it.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use docsweep_core::{plan_links, ArchiveRef, CandidateLink, LinkAction, PlannedLink};
use futures_util::stream::{self, StreamExt};
use sweep_logging::{human_size, sweep_debug, sweep_error, sweep_info, sweep_warn};
use url::Url;

use crate::archive::{append_members, scan_members, ArchiveError, StagedMember};
use crate::extract::ExtractionError;
use crate::filename::{derived_text_name, disambiguated_text_name};
use crate::ledger::LedgerScope;
use crate::persist::AtomicFileWriter;
use crate::pipeline::{Pipeline, PipelineError};
use crate::select::ParseError;
use crate::types::{FetchError, FetchedDocument, LinkOutcome, ZipOutcome, ZipReport};

impl Pipeline {
    /// Processes a ZIP unless the ZIP-scope ledger already lists it.
    ///
    /// Per-member, per-link and per-archive failures end up in the returned
    /// outcome. Only a ledger write error is returned as `Err`.
    pub fn process_zip(&mut self, archive: &ArchiveRef) -> Result<ZipOutcome, PipelineError> {
        self.process_zip_exporting(archive, None)
    }

    /// Like [`Pipeline::process_zip`], additionally copying the archive to
    /// `<results>/<export>` between the commit and the ledger record.
    pub(crate) fn process_zip_exporting(
        &mut self,
        archive: &ArchiveRef,
        export: Option<&Path>,
    ) -> Result<ZipOutcome, PipelineError> {
        if self.ledger.contains(LedgerScope::Zip, &archive.ledger_key) {
            sweep_debug!("Skipping {}: already processed", archive);
            return Ok(ZipOutcome::AlreadyProcessed);
        }
        sweep_info!("Processing zip {}", archive);

        let scan = match scan_members(&archive.path) {
            Ok(scan) => scan,
            Err(err) => {
                sweep_error!("Cannot open {}: {}", archive, err);
                return Ok(ZipOutcome::Failed(err));
            }
        };

        let mut report = ZipReport {
            html_members: scan.html.len(),
            ..ZipReport::default()
        };
        for (member, message) in scan.unreadable {
            report
                .member_failures
                .push((member.clone(), ParseError::Read { member, message }));
        }

        let mut candidates = Vec::new();
        for member in scan.html {
            let bytes = match member.bytes {
                Ok(bytes) => bytes,
                Err(message) => {
                    sweep_warn!("Cannot read {} in {}: {}", member.name, archive, message);
                    let failure = ParseError::Read {
                        member: member.name.clone(),
                        message,
                    };
                    report.member_failures.push((member.name, failure));
                    continue;
                }
            };
            match self.selector.select(&bytes) {
                Ok(links) => {
                    sweep_debug!("{} in {}: {} document links", member.name, archive, links.len());
                    candidates.extend(links.into_iter().map(|link| CandidateLink {
                        href: link.href,
                        anchor_text: link.text,
                        archive: archive.ledger_key.clone(),
                    }));
                }
                Err(err) => {
                    sweep_warn!("Cannot parse {} in {}: {}", member.name, archive, err);
                    report.member_failures.push((member.name, err));
                }
            }
        }

        let planned = plan_links(candidates, &self.config, &archive.path);
        let fetched = self.fetch_planned(&planned);

        let mut staged: Vec<StagedMember> = Vec::new();
        let mut staged_names = HashSet::new();
        for (plan, result) in planned.into_iter().zip(fetched) {
            let outcome = match (plan.action, result) {
                (LinkAction::Fetch(url), Some(Ok(document))) => {
                    self.stage_document(&url, document, &mut staged, &mut staged_names)
                }
                (LinkAction::Fetch(url), Some(Err(err))) => {
                    sweep_warn!("Fetch failed for {}: {}", url, err);
                    LinkOutcome::FetchFailed(err)
                }
                (action, _) => {
                    sweep_info!("Not fetching {}: {:?}", plan.link.href, action);
                    LinkOutcome::Skipped(action)
                }
            };
            report.links.push((plan.link.href, outcome));
        }

        if self.config.sweep_loose_text {
            report.loose_swept = stage_loose_text(&archive.path, &mut staged, &mut staged_names);
        }

        if !staged.is_empty() {
            match append_members(&archive.path, &staged) {
                Ok(commit) => {
                    sweep_info!(
                        "Committed {} members into {} ({} already present)",
                        commit.appended.len(),
                        archive,
                        commit.already_present.len()
                    );
                    report.appended = commit.appended;
                    report.already_present = commit.already_present;
                }
                Err(err) => {
                    sweep_error!("Commit into {} failed: {}", archive, err);
                    return Ok(ZipOutcome::Failed(err));
                }
            }
            for member in &staged {
                let Some(source) = &member.loose_source else {
                    continue;
                };
                if !report.appended.contains(&member.name) {
                    sweep_warn!(
                        "Kept {:?}: {} already has a member named {}",
                        source,
                        archive,
                        member.name
                    );
                    continue;
                }
                if let Err(err) = fs::remove_file(source) {
                    sweep_warn!("Could not remove packed file {:?}: {}", source, err);
                }
            }
        }

        if let Some(relative) = export {
            if let Err(err) = self.export_zip(archive, relative) {
                sweep_error!("Export of {} failed: {}", archive, err);
                return Ok(ZipOutcome::Failed(err));
            }
        }

        self.ledger.record(LedgerScope::Zip, &archive.ledger_key)?;
        sweep_info!(
            "Finished {}: {} fetched, {} staged, {} failed",
            archive,
            report.fetch_attempts(),
            report.staged(),
            report.failures()
        );
        Ok(ZipOutcome::Completed(report))
    }

    /// Runs every `Fetch` action through the bounded pool. The result lines
    /// up with `planned`; non-fetch actions get `None`.
    fn fetch_planned(
        &self,
        planned: &[PlannedLink],
    ) -> Vec<Option<Result<FetchedDocument, FetchError>>> {
        let fetcher = self.fetcher.as_ref();
        let concurrency = self.config.fetch_concurrency.max(1);
        self.runtime.block_on(
            stream::iter(planned)
                .map(|plan| async move {
                    match &plan.action {
                        LinkAction::Fetch(url) => Some(fetcher.fetch(url.as_str()).await),
                        _ => None,
                    }
                })
                .buffered(concurrency)
                .collect(),
        )
    }

    fn stage_document(
        &self,
        url: &Url,
        document: FetchedDocument,
        staged: &mut Vec<StagedMember>,
        staged_names: &mut HashSet<String>,
    ) -> LinkOutcome {
        sweep_info!(
            "Fetched {} ({})",
            document.metadata.final_url,
            human_size(document.metadata.byte_len)
        );
        let text = document
            .kind
            .ok_or(ExtractionError::Unsupported)
            .and_then(|kind| self.extractor.extract(&document.bytes, kind));
        let text = match text {
            Ok(text) => text,
            Err(err) => {
                sweep_warn!("No text from {}: {}", url, err);
                return LinkOutcome::ExtractionFailed(err);
            }
        };

        let mut member_name = derived_text_name(url);
        if staged_names.contains(&member_name) {
            member_name = disambiguated_text_name(url);
        }
        staged_names.insert(member_name.clone());
        staged.push(StagedMember::text(member_name.clone(), &text));
        LinkOutcome::Staged { member_name }
    }

    fn export_zip(&self, archive: &ArchiveRef, relative: &Path) -> Result<(), ArchiveError> {
        let Some(results) = &self.config.results_dir else {
            return Ok(());
        };
        let bytes = fs::read(&archive.path)?;
        let target = AtomicFileWriter::new(results.clone()).write(relative, &bytes)?;
        sweep_info!("Exported {} to {:?}", archive, target);
        Ok(())
    }
}

/// Adds the `.txt` files lying directly next to `archive_path` to `staged`.
/// Returns how many were picked up.
fn stage_loose_text(
    archive_path: &Path,
    staged: &mut Vec<StagedMember>,
    staged_names: &mut HashSet<String>,
) -> usize {
    let dir = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            sweep_warn!("Cannot list {:?} for loose text: {}", dir, err);
            return 0;
        }
    };

    let mut loose: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_text_file(path))
        .collect();
    loose.sort();

    let mut count = 0;
    for path in loose {
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if staged_names.contains(&name) {
            sweep_warn!("Loose file {:?} clashes with a staged member; left in place", path);
            continue;
        }
        match fs::read(&path) {
            Ok(body) => {
                staged_names.insert(name.clone());
                staged.push(StagedMember {
                    name,
                    body,
                    loose_source: Some(path),
                });
                count += 1;
            }
            Err(err) => sweep_warn!("Cannot read loose file {:?}: {}", path, err),
        }
    }
    count
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}
