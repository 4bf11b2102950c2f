//! Directory preparation and crash-safe file replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{0:?} exists but is not a directory")]
    NotADirectory(PathBuf),
    #[error("directory {path:?} is unusable: {source}")]
    Unusable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn unusable(path: &Path) -> impl Fn(io::Error) -> PersistError + '_ {
    move |source| PersistError::Unusable {
        path: path.to_path_buf(),
        source,
    }
}

/// Makes sure `dir` is a directory we can create files in.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(PersistError::NotADirectory(dir.to_path_buf())),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(unusable(dir))?;
        }
        Err(err) => return Err(unusable(dir)(err)),
    }
    // Writability check; the temp file is removed again on drop.
    NamedTempFile::new_in(dir).map_err(unusable(dir))?;
    Ok(())
}

/// Removes `dir` and everything below it, then recreates it empty.
pub fn reset_dir(dir: &Path) -> Result<(), PersistError> {
    if let Err(err) = fs::remove_dir_all(dir) {
        if err.kind() != io::ErrorKind::NotFound {
            return Err(unusable(dir)(err));
        }
    }
    ensure_output_dir(dir)
}

/// Writes files below a base directory so that readers only ever see the
/// previous or the complete new content.
pub struct AtomicFileWriter {
    base: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// Writes `content` to `base/relative`, creating intermediate
    /// directories. An existing file is replaced.
    pub fn write(&self, relative: &Path, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.base.join(relative);
        let dir = target.parent().unwrap_or(&self.base);
        ensure_output_dir(dir)?;

        let mut staging = NamedTempFile::new_in(dir)?;
        staging.write_all(content)?;
        staging.as_file().sync_all()?;
        staging
            .persist(&target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
