//! Configuration types for pixiv-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};

/// Environment variable holding the refresh token
pub const ENV_REFRESH_TOKEN: &str = "PIXIV_REFRESH_TOKEN";

/// Download behavior configuration (directories, naming, concurrency)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// File name template with `{author}`, `{title}` and `{id}` placeholders
    /// (default: "{author} - {title}_{id}")
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Maximum concurrent artwork downloads (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            filename_template: default_filename_template(),
            max_concurrent_downloads: default_max_concurrent(),
        }
    }
}

/// External tool paths (ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None; ignored with a warning if it does not resolve)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for ffmpeg if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// HTTP client settings for the app API and image hosts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Proxy URL applied to every request (from `https_proxy`)
    #[serde(default)]
    pub proxy: Option<String>,

    /// App API base URL (default: "https://app-api.pixiv.net")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            api_base_url: default_api_base_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// OAuth client settings and stored credentials
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Refresh token used to obtain access tokens (never serialized)
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,

    /// OAuth client id of the mobile app
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// OAuth client secret of the mobile app
    #[serde(default = "default_client_secret")]
    pub client_secret: String,

    /// Secret mixed into the `X-Client-Hash` header
    #[serde(default = "default_hash_secret")]
    pub hash_secret: String,

    /// Token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Authorization page the user opens in a browser
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Redirect URI registered for the mobile client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Env file the refresh token is written to after login or refresh (None = don't persist)
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_token: None,
            client_id: default_client_id(),
            client_secret: default_client_secret(),
            hash_secret: default_hash_secret(),
            token_url: default_token_url(),
            login_url: default_login_url(),
            redirect_uri: default_redirect_uri(),
            token_file: None,
        }
    }
}

/// Main configuration for ArtworkDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig): directory, naming, concurrency
/// - [`tools`](ToolsConfig): ffmpeg discovery
/// - [`network`](NetworkConfig): proxy, endpoints, timeouts
/// - [`auth`](AuthConfig): OAuth client and refresh token
///
/// Sub-config fields are flattened, so the serialized form has no nesting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// HTTP client settings
    #[serde(flatten)]
    pub network: NetworkConfig,

    /// OAuth settings
    #[serde(flatten)]
    pub auth: AuthConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Build configuration from the process environment
    ///
    /// Loads a `.env` file from the working directory if present, then reads
    /// `PIXIV_REFRESH_TOKEN`, `DOWNLOAD_PATH`, `FILENAME_TEMPLATE`,
    /// `https_proxy`/`HTTPS_PROXY`, `FFMPEG_PATH`, `PIXIV_TOKEN_FILE` and
    /// `MAX_CONCURRENT_DOWNLOADS`.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        let vars = repair_env_pairs(std::env::vars());
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Missing or empty values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        config.auth.refresh_token = get(ENV_REFRESH_TOKEN).map(|v| v.trim().to_string());
        if let Some(dir) = get("DOWNLOAD_PATH") {
            config.download.download_dir = PathBuf::from(dir);
        }
        if let Some(template) = get("FILENAME_TEMPLATE") {
            config.download.filename_template = template;
        }
        config.network.proxy = get("https_proxy").or_else(|| get("HTTPS_PROXY"));
        config.tools.ffmpeg_path = get("FFMPEG_PATH").map(PathBuf::from);
        config.auth.token_file = get("PIXIV_TOKEN_FILE").map(PathBuf::from);
        if let Some(limit) = get("MAX_CONCURRENT_DOWNLOADS") {
            config.download.max_concurrent_downloads =
                limit.trim().parse().map_err(|_| Error::Config {
                    message: format!("MAX_CONCURRENT_DOWNLOADS must be a positive integer, got {limit:?}"),
                    key: Some("max_concurrent_downloads".to_string()),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.download.filename_template.trim().is_empty() {
            return Err(Error::Config {
                message: "filename template must not be empty".to_string(),
                key: Some("filename_template".to_string()),
            });
        }

        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }

        if let Some(proxy) = &self.network.proxy {
            url::Url::parse(proxy).map_err(|e| Error::Config {
                message: format!("invalid proxy URL {proxy:?}: {e}"),
                key: Some("proxy".to_string()),
            })?;
        }

        url::Url::parse(&self.network.api_base_url).map_err(|e| Error::Config {
            message: format!("invalid API base URL: {e}"),
            key: Some("api_base_url".to_string()),
        })?;

        Ok(())
    }
}

/// Repair environment values that arrive as `KEY=VALUE`
///
/// Some tool hosts pass variables with the whole assignment as the value.
/// Such values are re-split and the embedded key takes the embedded value,
/// overriding any existing entry of that name.
pub fn repair_env_pairs<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut map = HashMap::new();
    let mut repaired = Vec::new();

    for (key, value) in vars {
        if let Some((inner_key, inner_value)) = value.split_once('=') {
            let inner_key = inner_key.trim();
            if is_env_key(inner_key) {
                repaired.push((inner_key.to_string(), inner_value.to_string()));
            }
        }
        map.insert(key, value);
    }

    for (key, value) in repaired {
        map.insert(key, value);
    }
    map
}

fn is_env_key(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

/// Write a refresh token into an env file
///
/// Replaces an existing `PIXIV_REFRESH_TOKEN=` line and keeps every other
/// line, or prepends the entry when the file has none. Creates the file if
/// it does not exist.
pub async fn persist_refresh_token(path: &Path, token: &str) -> Result<()> {
    let token_line = format!("{ENV_REFRESH_TOKEN}={token}");
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut found = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if line.trim_start().starts_with(&format!("{ENV_REFRESH_TOKEN}=")) {
                found = true;
                token_line.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.insert(0, token_line);
    }

    let mut content = lines.join("\n");
    content.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;

    tracing::info!(path = %path.display(), "refresh token saved");
    Ok(())
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_filename_template() -> String {
    "{author} - {title}_{id}".to_string()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://app-api.pixiv.net".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "PixivAndroidApp/5.0.234 (Android 11; Pixel 5)".to_string()
}

fn default_client_id() -> String {
    "MOBrBDS8blbauoSck0ZfDbtuzpyT".to_string()
}

fn default_client_secret() -> String {
    "lsACyCD94FhDUtGTXi3QzcFE2uU1hqtDaKeqrdwj".to_string()
}

fn default_hash_secret() -> String {
    "28c1fdd170a5204386cb1313c7077b34f83e4aaf4aa829ce78c231e05b0bae2c".to_string()
}

fn default_token_url() -> String {
    "https://oauth.secure.pixiv.net/auth/token".to_string()
}

fn default_login_url() -> String {
    "https://app-api.pixiv.net/web/v1/login".to_string()
}

fn default_redirect_uri() -> String {
    "https://app-api.pixiv.net/web/v1/users/auth/pixiv/callback".to_string()
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
