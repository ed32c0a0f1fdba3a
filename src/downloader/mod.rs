//! Background artwork download coordinator, split into focused submodules.
//!
//! The `ArtworkDownloader` struct and its methods are organized by domain:
//! - [`dispatch`] - Deduplication and task spawning
//! - [`task`] - Per-artwork download execution
//! - [`config_ops`] - Runtime download directory changes
//! - [`lifecycle`] - Credential refresh, login and idle tracking

mod config_ops;
mod dispatch;
mod lifecycle;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::auth::{CredentialExchange, Credentials};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::planner::FilenameTemplate;
use crate::remote::{HttpPixivClient, PixivApi};
use crate::session::SessionRefresher;
use crate::synthesis::{FrameEncoder, FrameSequenceSynthesizer, select_encoder};
use crate::types::Capabilities;
use std::path::PathBuf;
use std::sync::Arc;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Dispatching returns immediately; each artwork is downloaded by its own
/// background task, at most `max_concurrent_downloads` at a time.
#[derive(Clone)]
pub struct ArtworkDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Download root for newly dispatched tasks
    pub(crate) download_root: Arc<std::sync::RwLock<PathBuf>>,
    /// File name template applied to every artwork
    pub(crate) template: FilenameTemplate,
    /// Remote API
    pub(crate) api: Arc<dyn PixivApi>,
    /// Refreshes the session when a remote call reports expiry
    pub(crate) session: Arc<dyn SessionRefresher>,
    /// Token exchange, when the downloader owns real credentials
    pub(crate) exchange: Option<Arc<CredentialExchange>>,
    /// Animated artwork pipeline
    pub(crate) synthesizer: FrameSequenceSynthesizer,
    /// Semaphore bounding how many artworks download at once
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Every spawned download task
    pub(crate) tasks: tokio_util::task::TaskTracker,
}

impl ArtworkDownloader {
    /// Create a new ArtworkDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration and creates the download directory
    /// - Builds the HTTP clients for the app API and the token endpoint
    /// - Detects the frame encoder
    /// - Refreshes the access token when a refresh token is configured
    ///
    /// A failed startup refresh is logged, not returned: the downloader stays
    /// usable and can be logged in later.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let credentials = match &config.auth.refresh_token {
            Some(token) => Credentials::with_refresh_token(token.clone()),
            None => Credentials::new(),
        };

        let exchange = Arc::new(CredentialExchange::new(&config, credentials.clone())?);
        let api: Arc<dyn PixivApi> = Arc::new(HttpPixivClient::new(&config, credentials.clone())?);
        let encoder = select_encoder(&config.tools);

        if credentials.refresh_token().await.is_some() {
            match exchange.refresh().await {
                Ok(()) => tracing::info!("Startup credential refresh succeeded"),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Startup credential refresh failed, log in or refresh before dispatching"
                ),
            }
        } else {
            tracing::info!("No refresh token configured, log in before dispatching");
        }

        let mut downloader = Self::with_components(config, api, exchange.clone(), encoder);
        downloader.exchange = Some(exchange);
        Ok(downloader)
    }

    /// Assemble a downloader from explicit components
    ///
    /// Used by hosts that bring their own API adapter and by tests.
    /// No directory is created and no network call is made.
    pub fn with_components(
        config: Config,
        api: Arc<dyn PixivApi>,
        session: Arc<dyn SessionRefresher>,
        encoder: Arc<dyn FrameEncoder>,
    ) -> Self {
        let concurrent_limit = Arc::new(tokio::sync::Semaphore::new(
            config.download.max_concurrent_downloads.max(1),
        ));
        let synthesizer = FrameSequenceSynthesizer::new(api.clone(), session.clone(), encoder);

        Self {
            download_root: Arc::new(std::sync::RwLock::new(config.download.download_dir.clone())),
            template: FilenameTemplate::new(config.download.filename_template.clone()),
            config: Arc::new(config),
            api,
            session,
            exchange: None,
            synthesizer,
            concurrent_limit,
            tasks: tokio_util::task::TaskTracker::new(),
        }
    }

    /// Get the configuration the downloader was built with
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Query the current system capabilities
    ///
    /// Reports whether animated artworks can be converted, based on the
    /// frame encoder detected at construction.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            frame_sequences: self.synthesizer.is_available(),
            encoder: self.synthesizer.encoder_name(),
        }
    }
}
