//! Scratch directories for tests that touch the filesystem.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary asset root, removed when dropped.
pub struct TempAssetRoot {
    dir: TempDir,
}

impl TempAssetRoot {
    pub fn new(prefix: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `sqlite://` URL for a database file inside the root, created on first connect.
    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path().join("db.sqlite").to_string_lossy())
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }
}
