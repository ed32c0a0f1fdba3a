//! Frame-sequence synthesis
//!
//! Turns an animated artwork into one GIF:
//!
//! 1. fetch the frame metadata (archive URL + per-frame delays);
//! 2. download the frame archive next to the output;
//! 3. extract it into a private `.ugoira-<id>` directory;
//! 4. write a concat manifest in playback order;
//! 5. run the [`FrameEncoder`] inside the extraction directory.
//!
//! The archive and the extraction directory are held by a [`ScratchSpace`]
//! and removed whatever the outcome.

mod archive;
mod encoder;
mod manifest;
mod scratch;

pub use archive::{extract_frames, extract_zip};
pub use encoder::{CliFrameEncoder, EncoderCapabilities, FrameEncoder, NoOpFrameEncoder};
pub use manifest::{MANIFEST_FILE, render_manifest, write_manifest};
pub use scratch::{ScratchLocks, ScratchSpace};

use crate::config::ToolsConfig;
use crate::error::{Error, Result, SynthesisError};
use crate::planner::{ensure_dir, file_name_from_url, sanitize_filename};
use crate::remote::PixivApi;
use crate::session::{SessionRefresher, with_session_refresh};
use crate::types::{ArtworkId, FrameDescriptor, UgoiraMetadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

/// Pick the frame encoder for this process
///
/// An explicit `ffmpeg_path` wins when it resolves to an executable; otherwise
/// ffmpeg is looked up in PATH when `search_path` is set. Without a binary,
/// animated works are skipped.
pub fn select_encoder(tools: &ToolsConfig) -> Arc<dyn FrameEncoder> {
    let encoder: Arc<dyn FrameEncoder> = if let Some(path) = &tools.ffmpeg_path {
        match which::which(path) {
            Ok(resolved) => Arc::new(CliFrameEncoder::new(resolved)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "configured ffmpeg not found, animated artworks will be skipped"
                );
                Arc::new(NoOpFrameEncoder)
            }
        }
    } else if tools.search_path {
        CliFrameEncoder::from_path()
            .map(|h| Arc::new(h) as Arc<dyn FrameEncoder>)
            .unwrap_or_else(|| {
                tracing::warn!("ffmpeg not found in PATH, animated artworks will be skipped");
                Arc::new(NoOpFrameEncoder)
            })
    } else {
        Arc::new(NoOpFrameEncoder)
    };

    tracing::info!(
        encoder = encoder.name(),
        can_encode = encoder.capabilities().can_encode,
        "Frame encoder initialized"
    );

    encoder
}

/// Name of the private extraction directory for an artwork
pub fn extraction_dir_name(id: ArtworkId) -> String {
    format!(".ugoira-{id}")
}

/// Runs the synthesis pipeline for animated artworks
#[derive(Clone)]
pub struct FrameSequenceSynthesizer {
    api: Arc<dyn PixivApi>,
    session: Arc<dyn SessionRefresher>,
    encoder: Arc<dyn FrameEncoder>,
    scratch_locks: ScratchLocks,
}

impl FrameSequenceSynthesizer {
    /// Create a synthesizer over the given remote API, refresher and encoder
    pub fn new(
        api: Arc<dyn PixivApi>,
        session: Arc<dyn SessionRefresher>,
        encoder: Arc<dyn FrameEncoder>,
    ) -> Self {
        Self {
            api,
            session,
            encoder,
            scratch_locks: ScratchLocks::default(),
        }
    }

    /// Whether the active encoder can produce GIFs
    pub fn is_available(&self) -> bool {
        self.encoder.capabilities().can_encode
    }

    /// Name of the active encoder
    pub fn encoder_name(&self) -> &'static str {
        self.encoder.name()
    }

    /// Convert an animated artwork into a GIF at `output`
    ///
    /// `target_dir` holds the output and, for the duration of the call, the
    /// frame archive and extraction directory.
    ///
    /// # Errors
    ///
    /// - [`SynthesisError::EncoderUnavailable`] before any remote or disk work
    ///   when no encoder is installed
    /// - [`SynthesisError::EmptyFrameSequence`] when the metadata lists no frames
    /// - [`Error::MalformedMetadata`] when the archive URL is missing
    /// - [`SynthesisError::MissingFrame`] when a listed frame is not in the archive
    /// - [`SynthesisError::EncoderFailed`] / [`SynthesisError::MissingOutput`]
    ///   when encoding fails
    /// - any error from the remote calls, after the session wrapper
    pub async fn synthesize(
        &self,
        id: ArtworkId,
        target_dir: &Path,
        output: &Path,
    ) -> Result<PathBuf> {
        if !self.is_available() {
            return Err(Error::Synthesis(SynthesisError::EncoderUnavailable));
        }

        let metadata =
            with_session_refresh(self.session.as_ref(), || self.api.ugoira_metadata(id)).await?;
        let archive_url = validate_metadata(id, &metadata)?;

        ensure_dir(target_dir).await?;

        let _slot = self.scratch_locks.lock(id).await;
        let archive_name = file_name_from_url(archive_url)
            .map(|name| sanitize_filename(&name))
            .unwrap_or_else(|| format!("{id}_ugoira.zip"));
        let scratch = ScratchSpace::acquire(
            target_dir.join(archive_name),
            target_dir.join(extraction_dir_name(id)),
        )
        .await?;

        let result = self
            .run(id, archive_url, &metadata.frames, &scratch, output)
            .await;
        scratch.release().await;

        match &result {
            Ok(path) => tracing::info!(
                artwork_id = id.0,
                path = %path.display(),
                frames = metadata.frames.len(),
                "Animated artwork saved"
            ),
            Err(e) => tracing::debug!(artwork_id = id.0, error = %e, "synthesis failed"),
        }

        result
    }

    async fn run(
        &self,
        id: ArtworkId,
        archive_url: &str,
        frames: &[FrameDescriptor],
        scratch: &ScratchSpace,
        output: &Path,
    ) -> Result<PathBuf> {
        let archive_path = scratch.archive_path();
        let bytes = with_session_refresh(self.session.as_ref(), || {
            self.api.download(archive_url, archive_path)
        })
        .await?;
        tracing::debug!(artwork_id = id.0, bytes, "frame archive downloaded");

        let work_dir = scratch.extract_dir();
        extract_frames(archive_path, work_dir).await?;

        for frame in frames {
            let name = manifest::frame_file_name(frame);
            let present = tokio::fs::metadata(work_dir.join(name))
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !present {
                return Err(Error::Synthesis(SynthesisError::MissingFrame {
                    id,
                    file: name.to_string(),
                }));
            }
        }

        let manifest = write_manifest(work_dir, frames).await?;
        let output = std::path::absolute(output)?;

        self.encoder
            .encode(id, work_dir, Path::new(MANIFEST_FILE), &output)
            .await?;

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(Error::Synthesis(SynthesisError::MissingOutput { path: output }));
        }

        tracing::debug!(artwork_id = id.0, manifest = %manifest.display(), "frames encoded");
        Ok(output)
    }
}

fn validate_metadata(id: ArtworkId, metadata: &UgoiraMetadata) -> Result<&str> {
    if metadata.frames.is_empty() {
        return Err(Error::Synthesis(SynthesisError::EmptyFrameSequence { id }));
    }
    metadata
        .zip_urls
        .medium
        .as_deref()
        .ok_or_else(|| Error::MalformedMetadata {
            id,
            reason: "missing frame archive URL".to_string(),
        })
}
