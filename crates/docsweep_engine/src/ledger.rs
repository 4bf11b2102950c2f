//! Durable record of archives that were fully processed.
//!
//! Each scope is a UTF-8 file with one ledger key per line. The file is read
//! completely on open and only ever appended to; every append is flushed and
//! synced before `record` returns, so a completed entry survives a crash and a
//! missing one causes the archive to be processed again.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sweep_logging::{sweep_debug, sweep_info, sweep_warn};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerScope {
    Rar,
    Zip,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ledger key contains a line break: {0:?}")]
    InvalidKey(String),
}

pub struct LedgerFile {
    path: PathBuf,
    entries: HashSet<String>,
    file: File,
}

impl LedgerFile {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let io_err = |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        };

        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(io_err(err)),
        };

        let torn_tail = !content.is_empty() && !content.ends_with('\n');
        let mut lines: Vec<&str> = content.lines().collect();
        if torn_tail {
            // An unterminated last line is an interrupted append; it never counted
            // and is cut off below.
            if let Some(partial) = lines.pop() {
                sweep_warn!("Dropping unterminated ledger line {:?} in {:?}", partial, path);
            }
        }
        let entries: HashSet<String> = lines
            .into_iter()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        if torn_tail {
            let valid_len = content.rfind('\n').map_or(0, |i| i + 1);
            let file = OpenOptions::new().write(true).open(path).map_err(io_err)?;
            file.set_len(valid_len as u64).map_err(io_err)?;
            file.sync_data().map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        sweep_info!("Loaded {} ledger entries from {:?}", entries.len(), path);
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Appends `key` unless already present. Returns whether a line was written.
    pub fn record(&mut self, key: &str) -> Result<bool, LedgerError> {
        if key.contains(['\n', '\r']) {
            return Err(LedgerError::InvalidKey(key.to_string()));
        }
        if self.entries.contains(key) {
            return Ok(false);
        }
        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        self.file
            .write_all(format!("{key}\n").as_bytes())
            .map_err(io_err)?;
        self.file.flush().map_err(io_err)?;
        self.file.sync_data().map_err(io_err)?;
        self.entries.insert(key.to_string());
        sweep_debug!("Recorded {} in {:?}", key, self.path);
        Ok(true)
    }
}

/// RAR-scope and ZIP-scope ledgers for one run.
pub struct ProgressLedger {
    rar: LedgerFile,
    zip: LedgerFile,
}

impl ProgressLedger {
    pub fn open(rar_path: &Path, zip_path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            rar: LedgerFile::open(rar_path)?,
            zip: LedgerFile::open(zip_path)?,
        })
    }

    pub fn scope(&self, scope: LedgerScope) -> &LedgerFile {
        match scope {
            LedgerScope::Rar => &self.rar,
            LedgerScope::Zip => &self.zip,
        }
    }

    pub fn contains(&self, scope: LedgerScope, key: &str) -> bool {
        self.scope(scope).contains(key)
    }

    pub fn record(&mut self, scope: LedgerScope, key: &str) -> Result<bool, LedgerError> {
        match scope {
            LedgerScope::Rar => self.rar.record(key),
            LedgerScope::Zip => self.zip.record(key),
        }
    }
}
