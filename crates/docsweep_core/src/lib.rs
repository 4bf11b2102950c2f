//! Docsweep core: pure types and decisions shared by the engine and the app.
mod archive;
mod config;
mod link;

pub use archive::{ArchiveKind, ArchiveRef};
pub use config::{FetchPolicy, PipelineConfig, SelectorTables, SizePolicy};
pub use link::{
    base_url_for_archive, classify_link, dedupe_and_cap, plan_links, CandidateLink, LinkAction,
    PlannedLink,
};
