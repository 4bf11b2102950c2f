use std::fmt;

use bytes::Bytes;
use docsweep_core::LinkAction;

use crate::archive::ArchiveError;
use crate::extract::{DocumentKind, ExtractionError};
use crate::select::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub bytes: Bytes,
    pub kind: Option<DocumentKind>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    /// `Content-Length` as sent by the server, if it parsed.
    pub declared_len: Option<u64>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MissingLength,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MissingLength => write!(f, "missing content length"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// What happened to one planned link during a ZIP pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    Staged { member_name: String },
    Skipped(LinkAction),
    FetchFailed(FetchError),
    ExtractionFailed(ExtractionError),
}

#[derive(Debug, Default)]
pub struct ZipReport {
    pub html_members: usize,
    pub member_failures: Vec<(String, ParseError)>,
    pub links: Vec<(String, LinkOutcome)>,
    /// Loose files picked up next to the archive.
    pub loose_swept: usize,
    /// Members written into the archive by this pass.
    pub appended: Vec<String>,
    /// Staged members that already existed in the archive.
    pub already_present: Vec<String>,
}

impl ZipReport {
    pub fn fetch_attempts(&self) -> usize {
        self.links
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, LinkOutcome::Skipped(_)))
            .count()
    }

    pub fn staged(&self) -> usize {
        self.links
            .iter()
            .filter(|(_, outcome)| matches!(outcome, LinkOutcome::Staged { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.links
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    LinkOutcome::FetchFailed(_) | LinkOutcome::ExtractionFailed(_)
                )
            })
            .count()
    }
}

#[derive(Debug)]
pub enum ZipOutcome {
    AlreadyProcessed,
    Completed(ZipReport),
    Failed(ArchiveError),
}

#[derive(Debug)]
pub enum RarOutcome {
    Completed { zips: Vec<(String, ZipOutcome)> },
    Failed(ArchiveError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rars_completed: usize,
    pub rars_skipped: usize,
    pub rars_failed: usize,
    pub zips_completed: usize,
    pub zips_skipped: usize,
    pub zips_failed: usize,
    pub fetch_attempts: usize,
    pub documents_staged: usize,
}

impl RunSummary {
    pub(crate) fn absorb_zip(&mut self, outcome: &ZipOutcome) {
        match outcome {
            ZipOutcome::AlreadyProcessed => self.zips_skipped += 1,
            ZipOutcome::Completed(report) => {
                self.zips_completed += 1;
                self.fetch_attempts += report.fetch_attempts();
                self.documents_staged += report.staged();
            }
            ZipOutcome::Failed(_) => self.zips_failed += 1,
        }
    }
}
