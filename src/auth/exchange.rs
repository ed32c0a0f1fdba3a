//! Token endpoint client (authorization-code and refresh grants)

use crate::auth::pkce::CodeVerifier;
use crate::auth::state::Credentials;
use crate::config::{AuthConfig, Config, persist_refresh_token};
use crate::error::{AuthError, Error, Result};
use crate::session::SessionRefresher;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Longest slice of an error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Successful response from the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for app API calls
    pub access_token: String,
    /// Long-lived refresh token (may be rotated)
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Authenticated user
    #[serde(default)]
    pub user: Option<TokenUser>,
}

/// User block of a token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    /// User id; the endpoint sends it as a string
    #[serde(default)]
    pub id: serde_json::Value,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl TokenResponse {
    /// Numeric user id, if the response carried one
    pub fn user_id(&self) -> Option<u64> {
        match &self.user.as_ref()?.id {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

/// Exchanges authorization codes and refresh tokens for access tokens
///
/// Owns the only write path into [`Credentials`]. Refreshes are serialized:
/// a caller that waited while another refresh succeeded returns without
/// contacting the token endpoint again.
pub struct CredentialExchange {
    client: reqwest::Client,
    auth: AuthConfig,
    credentials: Credentials,
    refresh_lock: Mutex<()>,
}

impl CredentialExchange {
    /// Create an exchange using the configured proxy, timeout and user agent
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let client = crate::remote::build_client(&config.network)?;
        Ok(Self::with_client(client, config.auth.clone(), credentials))
    }

    /// Create an exchange with an existing HTTP client
    pub fn with_client(client: reqwest::Client, auth: AuthConfig, credentials: Credentials) -> Self {
        Self {
            client,
            auth,
            credentials,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The credential handle this exchange updates
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// OAuth settings in use
    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }

    /// Exchange an authorization code and its verifier for a token pair
    ///
    /// On success the credentials are installed and the refresh token is
    /// persisted when a token file is configured.
    pub async fn exchange_code(&self, code: &str, verifier: &CodeVerifier) -> Result<()> {
        tracing::info!("exchanging authorization code for tokens");

        let token = self
            .request_token(&[
                ("client_id", self.auth.client_id.as_str()),
                ("client_secret", self.auth.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("code_verifier", verifier.as_str()),
                ("include_policy", "true"),
                ("redirect_uri", self.auth.redirect_uri.as_str()),
            ])
            .await?;

        self.install(token).await;
        Ok(())
    }

    /// Exchange the stored refresh token for a new token pair
    ///
    /// On failure the existing state is left untouched (still marked
    /// authenticated if it was) and the error is returned.
    pub async fn refresh(&self) -> Result<()> {
        let observed = self.credentials.generation();
        let _guard = self.refresh_lock.lock().await;

        if self.credentials.generation() != observed {
            tracing::debug!("credentials refreshed by a concurrent caller, skipping");
            return Ok(());
        }

        let refresh_token = self
            .credentials
            .refresh_token()
            .await
            .ok_or(Error::Auth(AuthError::MissingRefreshToken))?;

        tracing::info!("Refreshing access token");

        let token = self
            .request_token(&[
                ("client_id", self.auth.client_id.as_str()),
                ("client_secret", self.auth.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("include_policy", "true"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;

        self.install(token).await;
        Ok(())
    }

    async fn install(&self, token: TokenResponse) {
        let user_id = token.user_id();
        let rotated = self.credentials.refresh_token().await.as_deref()
            != Some(token.refresh_token.as_str());

        self.credentials
            .install(token.access_token, token.refresh_token.clone(), user_id)
            .await;

        tracing::info!(
            user_id = ?user_id,
            expires_in = ?token.expires_in,
            "Authenticated"
        );

        if let Some(path) = &self.auth.token_file
            && rotated
            && let Err(e) = persist_refresh_token(path, &token.refresh_token).await
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist refresh token");
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let (client_time, client_hash) = client_hash_headers(&self.auth.hash_secret);

        let response = self
            .client
            .post(&self.auth.token_url)
            .header("X-Client-Time", client_time)
            .header("X-Client-Hash", client_hash)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Auth(AuthError::TokenExchange {
                reason: format!("status {}: {}", status.as_u16(), truncate(&body)),
            }));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::Auth(AuthError::TokenExchange {
                reason: format!("unexpected token response: {e}"),
            })
        })
    }
}

#[async_trait]
impl SessionRefresher for CredentialExchange {
    async fn refresh_session(&self) -> Result<()> {
        self.refresh().await
    }
}

/// Build the `X-Client-Time` / `X-Client-Hash` header pair
///
/// The hash is the hex MD5 of the timestamp followed by the hash secret.
pub fn client_hash_headers(hash_secret: &str) -> (String, String) {
    let client_time = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S+00:00")
        .to_string();
    let hash = format!("{:x}", md5::compute(format!("{client_time}{hash_secret}")));
    (client_time, hash)
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
