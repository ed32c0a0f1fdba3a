//! Runtime configuration updates: download directory.

use crate::error::Result;
use crate::planner::{FilenameTemplate, ensure_dir};
use std::path::PathBuf;

use super::ArtworkDownloader;

impl ArtworkDownloader {
    /// Current download root
    ///
    /// Tasks capture the root when they are dispatched, so changing it does
    /// not move work already in flight.
    pub fn download_dir(&self) -> PathBuf {
        self.download_root
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Change the download root for subsequently dispatched artworks
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pixiv_dl::{ArtworkDownloader, Config};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let downloader = ArtworkDownloader::new(Config::default()).await?;
    /// downloader.set_download_dir("/data/pixiv").await?;
    /// downloader.dispatch([59580629u64]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_download_dir(&self, path: impl Into<PathBuf>) -> Result<PathBuf> {
        let path = path.into();
        ensure_dir(&path).await?;

        *self
            .download_root
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = path.clone();

        tracing::info!(path = %path.display(), "Download directory changed");
        Ok(path)
    }

    /// File name template applied to dispatched artworks
    pub fn filename_template(&self) -> &FilenameTemplate {
        &self.template
    }
}
