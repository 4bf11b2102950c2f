use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Rar,
    Zip,
}

impl ArchiveKind {
    /// Classifies a file by extension, ignoring ASCII case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("rar") {
            Some(Self::Rar)
        } else if ext.eq_ignore_ascii_case("zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// A discovered archive: where it lives now and the key it is recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveRef {
    pub path: PathBuf,
    pub ledger_key: String,
    pub kind: ArchiveKind,
}

impl ArchiveRef {
    /// An archive found directly by the walker; keyed by its path.
    pub fn discovered(path: impl Into<PathBuf>, kind: ArchiveKind) -> Self {
        let path = path.into();
        let ledger_key = path.to_string_lossy().into_owned();
        Self {
            path,
            ledger_key,
            kind,
        }
    }

    /// A ZIP unpacked from `parent` into a scratch area.
    ///
    /// The key combines the parent's key with the path inside the scratch root,
    /// so it survives the scratch directory being wiped and reused.
    pub fn nested_zip(parent: &ArchiveRef, path: impl Into<PathBuf>, relative: &Path) -> Self {
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            path: path.into(),
            ledger_key: format!("{}!{}", parent.ledger_key, relative),
            kind: ArchiveKind::Zip,
        }
    }
}

impl fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ledger_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_detected_case_insensitively() {
        assert_eq!(ArchiveKind::from_path(Path::new("a/b.RAR")), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::from_path(Path::new("b.zip")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_path(Path::new("b.html")), None);
        assert_eq!(ArchiveKind::from_path(Path::new("zip")), None);
    }

    #[test]
    fn nested_key_is_anchored_on_parent() {
        let rar = ArchiveRef::discovered("data/sites.rar", ArchiveKind::Rar);
        let nested = ArchiveRef::nested_zip(
            &rar,
            "tmp/example.com/site.zip",
            Path::new("example.com/site.zip"),
        );
        assert_eq!(nested.ledger_key, "data/sites.rar!example.com/site.zip");
        assert_eq!(nested.kind, ArchiveKind::Zip);
    }
}
