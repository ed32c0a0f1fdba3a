//! Per-artwork download execution.

use crate::error::Result;
use crate::planner::{DownloadPlan, ensure_dir, plan_download};
use crate::session::with_session_refresh;
use crate::types::DownloadTask;

use super::ArtworkDownloader;

impl ArtworkDownloader {
    /// Download one artwork: fetch metadata, plan the layout, then either
    /// fetch the images or synthesize the animation
    ///
    /// Steps run strictly in order; the first failure ends the task.
    pub(crate) async fn run_download_task(&self, task: DownloadTask) -> Result<()> {
        let DownloadTask { id, root, template } = task;

        let artwork =
            with_session_refresh(self.session.as_ref(), || self.api.illust_detail(id)).await?;
        let plan = plan_download(&artwork, &root, &template)?;

        tracing::debug!(
            artwork_id = id.0,
            shape = ?artwork.shape(),
            target = %plan.target_dir().display(),
            "planned artwork download"
        );

        match plan {
            DownloadPlan::Images { target_dir, files } => {
                ensure_dir(&target_dir).await?;

                for file in &files {
                    let bytes = with_session_refresh(self.session.as_ref(), || {
                        self.api.download(&file.url, &file.path)
                    })
                    .await?;
                    tracing::debug!(
                        artwork_id = id.0,
                        path = %file.path.display(),
                        bytes,
                        "image saved"
                    );
                }

                tracing::info!(
                    artwork_id = id.0,
                    pages = files.len(),
                    path = %target_dir.display(),
                    "Artwork downloaded"
                );
            }
            DownloadPlan::FrameSequence { target_dir, output } => {
                self.synthesizer.synthesize(id, &target_dir, &output).await?;
            }
        }

        Ok(())
    }
}
