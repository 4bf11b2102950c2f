use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use docsweep_core::PipelineConfig;
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::extract::{DocumentTextExtractor, TextExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::ledger::{LedgerError, ProgressLedger};
use crate::rar::{RarUnpacker, UnarUnpacker};
use crate::scratch::{ScratchProvider, SharedScratch};
use crate::select::LinkSelector;

/// Errors that abort a whole run. Everything else is reported per archive.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("failed to list {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Owns everything one run touches: the ledgers, the collaborators behind
/// their trait seams and the runtime the fetches are driven on.
///
/// The stage processors live in `zip_stage`, `rar_stage` and `walker`.
pub struct Pipeline {
    pub(crate) config: PipelineConfig,
    pub(crate) ledger: ProgressLedger,
    pub(crate) selector: LinkSelector,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) extractor: Box<dyn TextExtractor>,
    pub(crate) unpacker: Box<dyn RarUnpacker>,
    pub(crate) scratch: Box<dyn ScratchProvider>,
    pub(crate) runtime: Runtime,
}

impl Pipeline {
    /// Opens both ledgers and wires the default collaborators: reqwest for
    /// fetching, the built-in format readers, `unar` and the shared scratch
    /// directory.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let ledger = ProgressLedger::open(&config.rar_ledger_path, &config.zip_ledger_path)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(PipelineError::Runtime)?;

        Ok(Self {
            selector: LinkSelector::new(config.selector.clone()),
            fetcher: Arc::new(ReqwestFetcher::new(FetchSettings::from(&config.fetch))),
            extractor: Box::new(DocumentTextExtractor),
            unpacker: Box::new(UnarUnpacker::new(config.unar_program.clone())),
            scratch: Box::new(SharedScratch::new(config.scratch_dir.clone())),
            ledger,
            runtime,
            config,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_unpacker(mut self, unpacker: Box<dyn RarUnpacker>) -> Self {
        self.unpacker = unpacker;
        self
    }

    pub fn with_scratch(mut self, scratch: Box<dyn ScratchProvider>) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }
}
