use crate::error::{Error, Result};
use crate::host::FileSystem;
use std::path::{Path, PathBuf};

/// Filesystem access under a root directory.
/// Defaults to `/` in production, redirectable to a temp directory for testing.
#[derive(Debug, Clone)]
pub struct RootFs {
    root: PathBuf,
}

impl Default for RootFs {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl RootFs {
    /// A RootFs pointing at the real system.
    pub fn system() -> Self {
        Self::default()
    }

    /// A RootFs pointing at a custom directory (for testing).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a path against this root.
    /// Absolute paths are re-anchored: `/etc/x` -> `<root>/etc/x`.
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    /// Read a file and trim surrounding whitespace, `None` if missing or unreadable.
    pub fn read_trimmed(&self, path: impl AsRef<Path>) -> Option<String> {
        std::fs::read_to_string(self.path(path))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl FileSystem for RootFs {
    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        let full = self.path(path);
        match std::fs::read_to_string(&full) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::FileRead {
                path: full,
                source: e,
            }),
        }
    }

    fn write_file(&mut self, path: &Path, content: &str) -> Result<()> {
        let full = self.path(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::FileWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&full, content).map_err(|e| Error::FileWrite {
            path: full,
            source: e,
        })
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        let full = self.path(path);
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::FileWrite {
                path: full,
                source: e,
            }),
        }
    }
}
