//! Error types for pixiv-dl
//!
//! This module provides the error handling for the library, including:
//! - Domain-specific error types (Api, Auth, Synthesis)
//! - Typed session-expiry classification for remote API failures
//! - The structured error body returned by the remote API
//! - Context information (artwork ID, archive path, encoder status, etc.)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ArtworkId;

/// Result type alias for pixiv-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pixiv-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filename_template")
        key: Option<String>,
    },

    /// The remote API answered with an error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Credential acquisition or refresh failed
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Frame-sequence synthesis failed
    #[error("synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Artwork metadata is missing a field the download needs
    #[error("malformed metadata for artwork {id}: {reason}")]
    MalformedMetadata {
        /// The artwork whose metadata was unusable
        id: ArtworkId,
        /// What was missing or invalid
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// External tool execution failed (spawn failure, missing binary, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors reported by the remote API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The access token is invalid, expired or was rejected by the OAuth layer
    #[error("session expired: {message}")]
    SessionExpired {
        /// Message from the API error body
        message: String,
        /// Reason field from the API error body
        reason: String,
    },

    /// The API rejected the request for a reason unrelated to the session
    #[error("{message} {reason}")]
    Rejected {
        /// Message from the API error body
        message: String,
        /// Reason field from the API error body
        reason: String,
    },

    /// Non-success HTTP status without a structured error body
    #[error("request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },
}

/// Credential exchange errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No access token is available yet
    #[error("not authenticated")]
    NotAuthenticated,

    /// A refresh was requested but no refresh token is known
    #[error("no refresh token configured")]
    MissingRefreshToken,

    /// The callback URL supplied by the user could not be used
    #[error("malformed callback URL: {reason}")]
    MalformedCallback {
        /// Why the callback was rejected
        reason: String,
    },

    /// `complete` was called without a pending authorization attempt
    #[error("no authorization attempt is pending")]
    NoPendingAttempt,

    /// The token endpoint refused the exchange
    #[error("token exchange failed: {reason}")]
    TokenExchange {
        /// Error text returned by the token endpoint
        reason: String,
    },

    /// Every allowed authorization attempt failed
    #[error("authorization failed after {attempts} attempts")]
    AttemptsExhausted {
        /// Number of attempts that were made
        attempts: u32,
    },

    /// A session-expired call could not be recovered because the refresh failed
    #[error("{original} (credential refresh failed: {reason})")]
    RefreshFailed {
        /// The error returned by the original call
        original: Box<Error>,
        /// Why the refresh failed
        reason: String,
    },
}

/// Frame-sequence (ugoira) synthesis errors
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// No encoder binary is available on this host
    #[error("frame encoder unavailable: configure ffmpeg_path or ensure ffmpeg is in PATH")]
    EncoderUnavailable,

    /// The encoder exited with a non-zero status
    #[error("encoder failed for artwork {id} (exit status {status:?}): {stderr}")]
    EncoderFailed {
        /// The artwork being encoded
        id: ArtworkId,
        /// Exit code, if the process was not killed by a signal
        status: Option<i32>,
        /// Diagnostic output captured from the encoder's error stream
        stderr: String,
    },

    /// The encoder reported success but produced no output file
    #[error("encoder produced no output at {path}")]
    MissingOutput {
        /// Where the output was expected
        path: PathBuf,
    },

    /// The metadata listed no frames
    #[error("artwork {id} has no frames")]
    EmptyFrameSequence {
        /// The artwork with an empty frame list
        id: ArtworkId,
    },

    /// A frame named in the metadata was not found in the archive
    #[error("frame {file} missing from archive for artwork {id}")]
    MissingFrame {
        /// The artwork being synthesized
        id: ArtworkId,
        /// The frame file name from the metadata
        file: String,
    },

    /// The frame archive could not be read
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

/// Error body returned by the remote API
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "user_message": "",
///     "message": "Error occurred at the OAuth process. Please check your Access Token to fix this. Error Message: invalid_grant",
///     "reason": ""
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information from the remote API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Developer-facing message
    #[serde(default)]
    pub message: String,

    /// Machine-oriented reason, often empty
    #[serde(default)]
    pub reason: String,

    /// End-user-facing message, often empty
    #[serde(default)]
    pub user_message: String,
}

/// Phrases that mark an error message as a session-expiry failure, lowercase
const SESSION_EXPIRY_SIGNATURES: [&str; 4] = ["invalid_grant", "invalid_token", "oauth", "unauthorized"];

/// Check whether a free-text error message matches a session-expiry signature
///
/// Matching is a case-insensitive substring search.
///
/// # Examples
///
/// ```
/// use pixiv_dl::error::matches_session_expiry;
///
/// assert!(matches_session_expiry("Error occurred at the OAuth process"));
/// assert!(matches_session_expiry("INVALID_GRANT"));
/// assert!(!matches_session_expiry("Rate Limit"));
/// ```
pub fn matches_session_expiry(message: &str) -> bool {
    let lower = message.to_lowercase();
    SESSION_EXPIRY_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

impl ApiError {
    /// Convert an API error body into a typed error
    ///
    /// Bodies whose message or reason matches a session-expiry signature become
    /// [`ApiError::SessionExpired`]; everything else is [`ApiError::Rejected`].
    pub fn from_body(body: ApiErrorBody) -> Self {
        let ErrorDetail {
            message,
            reason,
            user_message,
        } = body.error;
        let message = if message.is_empty() {
            user_message
        } else {
            message
        };

        if matches_session_expiry(&message) || matches_session_expiry(&reason) {
            ApiError::SessionExpired { message, reason }
        } else {
            ApiError::Rejected { message, reason }
        }
    }
}
