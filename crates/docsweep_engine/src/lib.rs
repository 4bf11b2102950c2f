//! Docsweep engine: archive traversal, link fetching, text extraction and the
//! progress ledger.
mod archive;
mod decode;
mod extract;
mod fetch;
mod filename;
mod ledger;
mod persist;
mod pipeline;
mod rar;
mod rar_stage;
mod scratch;
mod select;
mod types;
mod walker;
mod zip_stage;

pub use archive::{
    append_members, scan_members, ArchiveError, CommitReport, HtmlMember, MemberScan,
    StagedMember,
};
pub use decode::{decode_html, decode_with_fallback, DecodedText};
pub use extract::{DocumentKind, DocumentTextExtractor, ExtractionError, TextExtractor};
pub use fetch::{check_declared_length, FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{derived_text_name, disambiguated_text_name};
pub use ledger::{LedgerError, LedgerFile, LedgerScope, ProgressLedger};
pub use persist::{ensure_output_dir, reset_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, PipelineError};
pub use rar::{RarUnpacker, UnarUnpacker};
pub use scratch::{ScratchArea, ScratchProvider, SharedScratch, TempScratch};
pub use select::{contains_cyrillic, LinkSelector, ParseError, SelectedLink};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchedDocument, LinkOutcome, RarOutcome, RunSummary,
    ZipOutcome, ZipReport,
};
