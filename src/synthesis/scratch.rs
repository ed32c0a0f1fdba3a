//! Scoped intermediate files for one synthesis run

use crate::error::Result;
use crate::types::ArtworkId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Per-artwork locks serializing runs that share scratch paths
///
/// Two tasks for the same artwork would otherwise clear each other's
/// archive and frames. Entries nobody holds or waits on are pruned on the
/// next lock.
#[derive(Clone, Debug, Default)]
pub struct ScratchLocks {
    slots: Arc<Mutex<HashMap<ArtworkId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ScratchLocks {
    /// Wait until no other run holds the scratch paths of `id`
    pub async fn lock(&self, id: ArtworkId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(id).or_default())
        };
        slot.lock_owned().await
    }
}

/// Intermediate archive and extraction directory owned by one synthesis run
///
/// Both are removed by [`release`](ScratchSpace::release). If the scope is
/// dropped without being released (the task panicked or its future was
/// dropped), `Drop` removes them synchronously.
#[derive(Debug)]
pub struct ScratchSpace {
    archive: PathBuf,
    extract_dir: PathBuf,
    released: bool,
}

impl ScratchSpace {
    /// Claim the scratch paths, clearing leftovers from an earlier run
    pub async fn acquire(archive: PathBuf, extract_dir: PathBuf) -> Result<Self> {
        let scratch = Self {
            archive,
            extract_dir,
            released: false,
        };

        remove_file_async(&scratch.archive).await;
        remove_dir_async(&scratch.extract_dir).await;
        tokio::fs::create_dir_all(&scratch.extract_dir).await?;

        Ok(scratch)
    }

    /// Where the frame archive is downloaded to
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Where the frames are extracted to
    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// Remove the archive and the extraction directory
    ///
    /// Failures are logged, never returned: cleanup must not mask the outcome
    /// of the run.
    pub async fn release(mut self) {
        remove_dir_async(&self.extract_dir).await;
        remove_file_async(&self.archive).await;
        self.released = true;
        tracing::debug!(
            archive = %self.archive.display(),
            extract_dir = %self.extract_dir.display(),
            "released scratch space"
        );
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.extract_dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.extract_dir.display(), error = %e, "failed to remove extraction directory");
        }
        if let Err(e) = std::fs::remove_file(&self.archive)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.archive.display(), error = %e, "failed to remove frame archive");
        }
    }
}

async fn remove_dir_async(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove extraction directory");
    }
}

async fn remove_file_async(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove frame archive");
    }
}
