use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use sweep_logging::{sweep_debug, sweep_info};

use crate::archive::ArchiveError;

/// Unpacks a RAR archive into a directory.
pub trait RarUnpacker: Send + Sync {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError>;
}

/// Shells out to `unar`, which reads RAR4 and RAR5 including solid and
/// multi-volume archives.
#[derive(Debug, Clone)]
pub struct UnarUnpacker {
    program: PathBuf,
}

impl UnarUnpacker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for UnarUnpacker {
    fn default() -> Self {
        Self::new("unar")
    }
}

impl RarUnpacker for UnarUnpacker {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        if !archive.is_file() {
            return Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("RAR file not found: {}", archive.display()),
            )));
        }

        sweep_debug!("Running {:?} on {:?} into {:?}", self.program, archive, dest);
        let output = Command::new(&self.program)
            .arg("-o")
            .arg(dest)
            .arg("-D") // no wrapping directory
            .arg("-f")
            .arg(archive)
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ArchiveError::UnpackerMissing(format!(
                        "{} not found on PATH",
                        self.program.display()
                    ))
                } else {
                    ArchiveError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.contains("password") || stderr.contains("encrypted") {
                "password protected".to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(ArchiveError::Corrupt(format!(
                "{}: {reason}",
                archive.display()
            )));
        }
        sweep_info!("Unpacked {:?}", archive);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_archive_is_an_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = UnarUnpacker::default().unpack(&temp.path().join("none.rar"), temp.path());
        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }

    #[test]
    fn missing_program_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let rar = temp.path().join("a.rar");
        std::fs::write(&rar, b"Rar!").unwrap();
        let unpacker = UnarUnpacker::new("docsweep-no-such-unar-binary");
        let result = unpacker.unpack(&rar, temp.path());
        assert!(matches!(result, Err(ArchiveError::UnpackerMissing(_))));
    }
}
