//! Dispatching artworks to background tasks.

use crate::error::{Error, Result, SynthesisError};
use crate::session::with_session_refresh;
use crate::types::{ArtworkId, DispatchReceipt, DownloadTask};
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

use super::ArtworkDownloader;

impl ArtworkDownloader {
    /// Start downloading artworks in the background
    ///
    /// Duplicate ids are collapsed; one task is spawned per distinct id and
    /// the call returns without waiting for any of them. Per-artwork results
    /// are only visible in logs and on disk.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pixiv_dl::{ArtworkDownloader, Config};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = ArtworkDownloader::new(Config::from_env()?).await?;
    ///
    /// let receipt = downloader.dispatch([59580629u64, 44298467, 59580629]);
    /// assert_eq!(receipt.dispatched, 2);
    /// println!("{}", receipt.message());
    /// # Ok(())
    /// # }
    /// ```
    pub fn dispatch<I>(&self, ids: I) -> DispatchReceipt
    where
        I: IntoIterator,
        I::Item: Into<ArtworkId>,
    {
        let unique: BTreeSet<ArtworkId> = ids.into_iter().map(Into::into).collect();
        let root = self.download_dir();

        for &id in &unique {
            self.spawn_task(DownloadTask {
                id,
                root: root.clone(),
                template: self.template.clone(),
            });
        }

        let ids: Vec<ArtworkId> = unique.into_iter().collect();
        tracing::info!(
            dispatched = ids.len(),
            ids = ?ids,
            root = %root.display(),
            "Dispatched artwork downloads"
        );

        DispatchReceipt {
            dispatched: ids.len(),
            ids,
        }
    }

    /// Dispatch `count` artworks picked at random from the recommendation feed
    ///
    /// Dispatches fewer when the feed is shorter than `count`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched, after one session
    /// refresh when the session had expired.
    pub async fn dispatch_recommended(&self, count: usize) -> Result<DispatchReceipt> {
        let feed =
            with_session_refresh(self.session.as_ref(), || self.api.illust_recommended()).await?;

        if feed.len() < count {
            tracing::warn!(
                requested = count,
                available = feed.len(),
                "Recommendation feed shorter than requested"
            );
        }

        let chosen: Vec<ArtworkId> = {
            let mut rng = rand::thread_rng();
            feed.choose_multiple(&mut rng, count).map(|a| a.id).collect()
        };

        Ok(self.dispatch(chosen))
    }

    /// Spawn one task; the concurrency permit is taken inside the task so
    /// dispatch never waits
    fn spawn_task(&self, task: DownloadTask) {
        let downloader = self.clone();

        self.tasks.spawn(async move {
            let id = task.id;
            let _permit = match downloader.concurrent_limit.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(artwork_id = id.0, "Download slot semaphore closed");
                    return;
                }
            };

            match downloader.run_download_task(task).await {
                Ok(()) => {}
                Err(Error::Synthesis(SynthesisError::EncoderUnavailable)) => {
                    tracing::warn!(
                        artwork_id = id.0,
                        "Skipping animated artwork: no frame encoder available"
                    );
                }
                Err(e) => {
                    tracing::error!(artwork_id = id.0, error = %e, "Artwork download failed");
                }
            }
        });
    }
}
