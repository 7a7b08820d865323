//! Content-addressed artifact cache
//!
//! Artifacts live at `<CACHE_PATH>/<hash>_<region>_<kind>.<ext>`. A file
//! existing at its fingerprint path is a finished artifact; absence means
//! not yet computed. Filenames are content-addressed, so concurrent
//! workers racing on the same file write the same bytes; writes still go
//! through a `.tmp` staging path and an atomic rename so a reader never
//! observes a truncated artifact.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use tidepool_core::domain::params::{ArtifactKind, AssessmentParameters};

/// Handle on the worker's cache directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fingerprint path for an artifact of the given kind.
    pub fn artifact_path(&self, params: &AssessmentParameters, kind: ArtifactKind) -> PathBuf {
        self.root.join(params.artifact_file_name(kind))
    }

    /// Staging path written before the atomic rename.
    pub fn staging_path(path: &Path) -> PathBuf {
        let mut staged = path.as_os_str().to_owned();
        staged.push(".tmp");
        PathBuf::from(staged)
    }

    /// Whether a finished artifact exists at `path`.
    pub async fn contains(&self, path: &Path) -> bool {
        let hit = tokio::fs::metadata(path).await.is_ok();
        debug!(path = %path.display(), hit, "artifact cache probe");
        hit
    }

    /// Writes `bytes` to `path` via the staging file and an atomic rename.
    pub async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let staging = Self::staging_path(path);
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await
    }

    /// Promotes a staged artifact (written externally) to its final path.
    pub async fn promote(&self, staging: &Path, path: &Path) -> io::Result<()> {
        tokio::fs::rename(staging, path).await
    }
}
