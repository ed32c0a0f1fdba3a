//! # pixiv-dl
//!
//! Background artwork download library for Pixiv, built to sit behind a
//! tool-calling host.
//!
//! ## Design Philosophy
//!
//! pixiv-dl is designed to be:
//! - **Non-blocking** - Dispatching returns at once; work happens in background tasks
//! - **Bounded** - At most `max_concurrent_downloads` artworks download at a time
//! - **Self-healing sessions** - Expired access tokens are refreshed and the call retried once
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! Still images are saved as-is. Animated works (ugoira) are converted to a
//! GIF with ffmpeg when it is available and skipped otherwise.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixiv_dl::{ArtworkDownloader, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads PIXIV_REFRESH_TOKEN, DOWNLOAD_PATH, ... from the environment or .env
//!     let config = Config::from_env()?;
//!     let downloader = ArtworkDownloader::new(config).await?;
//!
//!     let receipt = downloader.dispatch([59580629u64, 44298467]);
//!     println!("{}", receipt.message());
//!
//!     downloader.wait_for_idle().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging in
//!
//! Without a refresh token, run the authorization-code login once:
//!
//! ```no_run
//! # use pixiv_dl::{ArtworkDownloader, Config};
//! # async fn example(downloader: ArtworkDownloader) -> Result<(), Box<dyn std::error::Error>> {
//! let mut login = downloader.login_flow().expect("downloader owns credentials");
//! let url = login.begin()?;
//! println!("Open {url} and paste the callback URL");
//! # let callback = String::new();
//! login.complete(&callback).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// OAuth login and token refresh
pub mod auth;
/// Configuration types
pub mod config;
/// Background download coordinator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Artwork classification and on-disk layout
pub mod planner;
/// Remote API access
pub mod remote;
/// Session-expiry detection and refresh-once retry
pub mod session;
/// Animated artwork to GIF conversion
pub mod synthesis;
/// Core types
pub mod types;

// Re-export commonly used types
pub use auth::{CredentialExchange, Credentials, LoginFlow, LoginState};
pub use config::Config;
pub use downloader::ArtworkDownloader;
pub use error::{ApiError, AuthError, Error, Result, SynthesisError};
pub use planner::{DownloadPlan, FilenameTemplate, plan_download, sanitize_filename};
pub use remote::{HttpPixivClient, PixivApi};
pub use session::{IsSessionExpired, SessionRefresher, with_session_refresh};
pub use synthesis::{CliFrameEncoder, FrameEncoder, NoOpFrameEncoder};
pub use types::{
    Artwork, ArtworkId, ArtworkKind, ArtworkShape, Capabilities, DispatchReceipt,
    FrameDescriptor, UgoiraMetadata,
};
