use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::persist::{reset_dir, PersistError};

/// An empty directory a RAR is unpacked into. Dropping it releases the
/// directory when it was private to this area.
#[derive(Debug)]
pub struct ScratchArea {
    path: PathBuf,
    _guard: Option<TempDir>,
}

impl ScratchArea {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait ScratchProvider: Send + Sync {
    fn acquire(&self) -> Result<ScratchArea, PersistError>;
}

/// One fixed directory, wiped before every use. Only one RAR may hold it at
/// a time.
#[derive(Debug, Clone)]
pub struct SharedScratch {
    dir: PathBuf,
}

impl SharedScratch {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScratchProvider for SharedScratch {
    fn acquire(&self) -> Result<ScratchArea, PersistError> {
        reset_dir(&self.dir)?;
        Ok(ScratchArea {
            path: self.dir.clone(),
            _guard: None,
        })
    }
}

/// A fresh temporary directory per acquisition, removed on drop.
#[derive(Debug, Clone, Default)]
pub struct TempScratch {
    parent: Option<PathBuf>,
}

impl TempScratch {
    pub fn in_dir(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: Some(parent.into()),
        }
    }
}

impl ScratchProvider for TempScratch {
    fn acquire(&self) -> Result<ScratchArea, PersistError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docsweep-");
        let dir = match &self.parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(ScratchArea {
            path: dir.path().to_path_buf(),
            _guard: Some(dir),
        })
    }
}
