//! Ephemeral Asset Cache
//!
//! Thumbnails and their blurred derivatives live in one directory. Every file
//! written while serving a command belongs to the current epoch; the whole
//! epoch is deleted right before the next command starts, and on shutdown.

use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A file on local ephemeral storage derived from a remote resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub path: PathBuf,
    /// True when produced by a transform of another asset
    pub derived: bool,
}

impl LocalAsset {
    pub fn original(path: PathBuf) -> Self {
        Self { path, derived: false }
    }

    pub fn derivative(path: PathBuf) -> Self {
        Self { path, derived: true }
    }
}

/// Outcome of one `clear_epoch` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearStats {
    pub removed: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Per-epoch registry of ephemeral files
pub struct AssetCache {
    dir: PathBuf,
    epoch: Mutex<Vec<PathBuf>>,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            epoch: Mutex::new(Vec::new()),
        }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if needed
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Record a path as belonging to the current epoch
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!("Cache register: {}", path.display());
        self.epoch.lock().push(path);
    }

    /// Snapshot of the current epoch
    pub fn registered(&self) -> Vec<PathBuf> {
        self.epoch.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.epoch.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.epoch.lock().is_empty()
    }

    /// Delete every file of the current epoch and start a new one.
    ///
    /// Best effort: a failed deletion is logged and skipped. The registered
    /// set is always empty afterwards.
    pub async fn clear_epoch(&self) -> ClearStats {
        let paths = std::mem::take(&mut *self.epoch.lock());
        let mut stats = ClearStats::default();

        for path in paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    stats.removed += 1;
                    info!("Removed cache file: {}", path.display());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    stats.missing += 1;
                    debug!("Cache file already gone: {}", path.display());
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("Failed to remove cache file {}: {}", path.display(), e);
                }
            }
        }

        stats
    }
}
