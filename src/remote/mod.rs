//! Remote API access
//!
//! [`PixivApi`] is the seam between the download pipeline and the platform.
//! [`HttpPixivClient`] implements it over the mobile app API; tests substitute
//! in-memory fakes.

mod http;
// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod fake;

pub use http::{DOWNLOAD_REFERER, HttpPixivClient};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::types::{Artwork, ArtworkId, UgoiraMetadata};
use async_trait::async_trait;
use std::path::Path;

/// Operations the download pipeline needs from the platform
///
/// Errors that mean "the access token is no longer valid" must be reported as
/// [`ApiError::SessionExpired`](crate::error::ApiError::SessionExpired) so the
/// session wrapper can recover from them.
#[async_trait]
pub trait PixivApi: Send + Sync {
    /// Fetch metadata for one artwork
    async fn illust_detail(&self, id: ArtworkId) -> Result<Artwork>;

    /// Fetch frame archive location and timing for an animated artwork
    async fn ugoira_metadata(&self, id: ArtworkId) -> Result<UgoiraMetadata>;

    /// Fetch the user's recommendation feed
    async fn illust_recommended(&self) -> Result<Vec<Artwork>>;

    /// Download `url` to `dest`, returning the number of bytes written
    ///
    /// A partially written file is removed on failure.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Build the HTTP client shared by the API adapter and the token exchange
pub(crate) fn build_client(network: &NetworkConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(network.request_timeout)
        .user_agent(network.user_agent.clone());

    if let Some(proxy_url) = &network.proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| Error::Config {
            message: format!("invalid proxy {proxy_url:?}: {e}"),
            key: Some("proxy".to_string()),
        })?;
        builder = builder.proxy(proxy);
        tracing::info!(proxy = %proxy_url, "using proxy");
    }

    builder
        .build()
        .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
}
