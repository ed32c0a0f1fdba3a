//! App API adapter over reqwest

use super::PixivApi;
use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{ApiError, ApiErrorBody, AuthError, Error, ErrorDetail, Result};
use crate::types::{Artwork, ArtworkId, UgoiraMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Referer the image hosts require on every download
pub const DOWNLOAD_REFERER: &str = "https://app-api.pixiv.net/";

#[derive(Deserialize)]
struct IllustDetailResponse {
    illust: Artwork,
}

#[derive(Deserialize)]
struct UgoiraMetadataResponse {
    ugoira_metadata: UgoiraMetadata,
}

#[derive(Deserialize)]
struct RecommendedResponse {
    #[serde(default)]
    illusts: Vec<Artwork>,
}

/// [`PixivApi`] implementation for the mobile app API
///
/// The bearer token is read from [`Credentials`] on every call, so a refresh
/// performed by another task is picked up by the next request.
#[derive(Clone)]
pub struct HttpPixivClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpPixivClient {
    /// Create a client using the configured endpoint, proxy and timeout
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let client = super::build_client(&config.network)?;
        Self::with_client(client, &config.network.api_base_url, credentials)
    }

    /// Create a client with an existing HTTP client and base URL
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
    ) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            credentials,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self
            .credentials
            .access_token()
            .await
            .ok_or(Error::Auth(AuthError::NotAuthenticated))?;

        let url = self.base_url.join(endpoint)?;
        tracing::debug!(endpoint, "app API request");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .header("App-OS", "android")
            .header("App-OS-Version", "11")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let value: serde_json::Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) if status.is_success() => return Err(Error::Serialization(e)),
            Err(_) => {
                return Err(Error::Api(ApiError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                }));
            }
        };

        if let Some(error) = value.get("error") {
            return Err(Error::Api(api_error_from_value(error)));
        }

        if !status.is_success() {
            return Err(Error::Api(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// Convert the `error` member of an API response into a typed error
///
/// The member is usually an object with `message`/`reason`/`user_message`,
/// but some endpoints send a bare string.
fn api_error_from_value(error: &serde_json::Value) -> ApiError {
    let detail = match error {
        serde_json::Value::String(message) => ErrorDetail {
            message: message.clone(),
            ..ErrorDetail::default()
        },
        other => serde_json::from_value(other.clone()).unwrap_or_default(),
    };
    ApiError::from_body(ApiErrorBody { error: detail })
}

async fn stream_to_file(mut response: reqwest::Response, dest: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl PixivApi for HttpPixivClient {
    async fn illust_detail(&self, id: ArtworkId) -> Result<Artwork> {
        let response: IllustDetailResponse = self
            .get_json("/v1/illust/detail", &[("illust_id", id.to_string())])
            .await?;
        Ok(response.illust)
    }

    async fn ugoira_metadata(&self, id: ArtworkId) -> Result<UgoiraMetadata> {
        let response: UgoiraMetadataResponse = self
            .get_json("/v1/ugoira/metadata", &[("illust_id", id.to_string())])
            .await?;
        Ok(response.ugoira_metadata)
    }

    async fn illust_recommended(&self) -> Result<Vec<Artwork>> {
        let response: RecommendedResponse = self
            .get_json(
                "/v1/illust/recommended",
                &[
                    ("content_type", "illust".to_string()),
                    ("include_ranking_label", "true".to_string()),
                    ("filter", "for_android".to_string()),
                ],
            )
            .await?;
        Ok(response.illusts)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, DOWNLOAD_REFERER)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }

        match stream_to_file(response, dest).await {
            Ok(bytes) => {
                tracing::debug!(url, path = %dest.display(), bytes, "download complete");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(dest).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(path = %dest.display(), error = %rm, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}
