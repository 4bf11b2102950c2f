//! ZIP member access for the stage processor: an integrity-checked scan of the
//! members and a single-commit append of staged text.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use sweep_logging::{sweep_debug, sweep_warn};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt archive: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
    #[error("unpacker unavailable: {0}")]
    UnpackerMissing(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// A text member waiting to be committed into a ZIP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMember {
    pub name: String,
    pub body: Vec<u8>,
    /// Loose file this member was read from; removed once the commit lands.
    pub loose_source: Option<PathBuf>,
}

impl StagedMember {
    pub fn text(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            body: text.as_bytes().to_vec(),
            loose_source: None,
        }
    }
}

#[derive(Debug)]
pub struct HtmlMember {
    pub name: String,
    /// Raw bytes, or why they could not be read.
    pub bytes: Result<Vec<u8>, String>,
}

/// What a ZIP holds, as far as the stage processor cares.
#[derive(Debug, Default)]
pub struct MemberScan {
    pub html: Vec<HtmlMember>,
    /// Members whose local header could not be read.
    pub unreadable: Vec<(String, String)>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub appended: Vec<String>,
    pub already_present: Vec<String>,
}

fn has_extension(name: &str, wanted: &[&str]) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| wanted.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::Corrupt(format!("{}: {e}", path.display())))
}

/// Reads every member header and the bytes of each HTML member.
///
/// A ZIP whose central directory cannot be read is `Corrupt`. A single bad
/// member is reported in [`MemberScan::unreadable`] and otherwise skipped.
pub fn scan_members(path: &Path) -> Result<MemberScan, ArchiveError> {
    let mut archive = open_zip(path)?;
    let mut scan = MemberScan::default();

    for index in 0..archive.len() {
        let label = archive
            .name_for_index(index)
            .map_or_else(|| format!("#{index}"), str::to_string);
        let mut member = match archive.by_index(index) {
            Ok(member) => member,
            Err(err) => {
                sweep_warn!("Unreadable member {} in {:?}: {}", label, path, err);
                scan.unreadable.push((label, err.to_string()));
                continue;
            }
        };
        let name = member.name().to_string();
        if member.is_dir() {
            continue;
        }

        if has_extension(&name, &["html", "htm"]) {
            let mut bytes = Vec::new();
            let bytes = match member.read_to_end(&mut bytes) {
                Ok(_) => Ok(bytes),
                Err(err) => Err(err.to_string()),
            };
            scan.html.push(HtmlMember { name, bytes });
        } else if has_extension(&name, &["zip"]) {
            sweep_debug!("Nested zip {} in {:?} is not descended", name, path);
        }
    }
    Ok(scan)
}

/// Appends `staged` to the ZIP at `path` in one commit.
///
/// The archive is copied next to itself, extended, synced and renamed over
/// the original, so a crash leaves either the old or the new archive. Names
/// that already exist as members are left alone and reported as
/// `already_present`.
pub fn append_members(path: &Path, staged: &[StagedMember]) -> Result<CommitReport, ArchiveError> {
    let existing: HashSet<String> = open_zip(path)?.file_names().map(str::to_string).collect();

    let mut report = CommitReport::default();
    let fresh: Vec<&StagedMember> = staged
        .iter()
        .filter(|member| {
            if existing.contains(&member.name) {
                report.already_present.push(member.name.clone());
                false
            } else {
                true
            }
        })
        .collect();
    if fresh.is_empty() {
        return Ok(report);
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    io::copy(&mut File::open(path)?, tmp.as_file_mut())?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new_append(tmp.as_file_mut())?;
    for member in fresh {
        writer.start_file(member.name.as_str(), options)?;
        writer.write_all(&member.body)?;
        report.appended.push(member.name.clone());
    }
    writer.finish()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| ArchiveError::Io(e.error))?;
    Ok(report)
}
