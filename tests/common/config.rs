//! Test configuration helpers: configs pointing at a mock server and a mocked token endpoint

use pixiv_dl::Config;
use pixiv_dl::config::{AuthConfig, DownloadConfig, NetworkConfig, ToolsConfig};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the token endpoint is mounted at on the mock server
pub const TOKEN_PATH: &str = "/auth/token";

/// Configuration whose API and token endpoints point at `server`
///
/// ffmpeg discovery is disabled so results do not depend on the host.
pub fn test_config(server: &MockServer, download_dir: &Path) -> Config {
    Config {
        download: DownloadConfig {
            download_dir: download_dir.to_path_buf(),
            max_concurrent_downloads: 3,
            ..Default::default()
        },
        tools: ToolsConfig {
            ffmpeg_path: None,
            search_path: false,
        },
        network: NetworkConfig {
            api_base_url: server.uri(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        auth: AuthConfig {
            token_url: format!("{}{}", server.uri(), TOKEN_PATH),
            ..Default::default()
        },
    }
}

/// Token endpoint JSON for the given pair
pub fn token_body(access_token: &str, refresh_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "expires_in": 3600,
        "token_type": "bearer",
        "scope": "",
        "refresh_token": refresh_token,
        "user": {"id": "2088434", "name": "tester", "account": "tester"}
    })
}

/// Answer every refresh grant with the given pair
pub async fn mount_refresh(server: &MockServer, access_token: &str, refresh_token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token, refresh_token)))
        .mount(server)
        .await;
}
