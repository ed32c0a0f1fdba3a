//! Session-aware call wrapper
//!
//! Every remote call that depends on the access token runs through
//! [`with_session_refresh`]. When the call fails because the session expired,
//! the wrapper refreshes the credentials once and re-runs the call once.
//!
//! # Example
//!
//! ```no_run
//! use pixiv_dl::session::{SessionRefresher, with_session_refresh};
//! use pixiv_dl::error::Result;
//!
//! # async fn example(refresher: &dyn SessionRefresher) -> Result<()> {
//! let value = with_session_refresh(refresher, || async {
//!     // Your remote call here
//!     Ok::<_, pixiv_dl::Error>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{ApiError, AuthError, Error, Result, matches_session_expiry};
use async_trait::async_trait;
use std::future::Future;

/// Trait for errors that can be classified as session-expiry failures
///
/// Expired or rejected access tokens should return `true`. Everything else,
/// including network failures and unrelated API rejections, returns `false`.
pub trait IsSessionExpired {
    /// Returns true if the error means the access token must be refreshed
    fn is_session_expired(&self) -> bool;
}

impl IsSessionExpired for Error {
    fn is_session_expired(&self) -> bool {
        match self {
            Error::Api(ApiError::SessionExpired { .. }) => true,
            // Untyped rejections still carry the platform's free-text message
            Error::Api(ApiError::Rejected { message, reason }) => {
                matches_session_expiry(message) || matches_session_expiry(reason)
            }
            Error::Api(ApiError::Status { status, .. }) => *status == 401,
            Error::Auth(AuthError::NotAuthenticated) => true,
            _ => false,
        }
    }
}

/// Something that can renew the access token
///
/// Implemented by [`CredentialExchange`](crate::auth::CredentialExchange); tests
/// substitute counting fakes.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Obtain a fresh access token
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available or the token
    /// endpoint rejects the refresh.
    async fn refresh_session(&self) -> Result<()>;
}

/// Run an operation, refreshing the session and retrying once on expiry
///
/// - success is returned as-is;
/// - a session-expiry error triggers one refresh; if the refresh succeeds the
///   operation runs exactly once more and that result is returned unchanged,
///   whatever it is;
/// - if the refresh fails, the original error is returned wrapped in
///   [`AuthError::RefreshFailed`];
/// - any other error is returned unmodified without a retry.
///
/// # Example
///
/// ```no_run
/// use pixiv_dl::session::{SessionRefresher, with_session_refresh};
/// use pixiv_dl::error::Error;
///
/// # async fn example(refresher: &dyn SessionRefresher) -> Result<(), Error> {
/// let result = with_session_refresh(refresher, || async {
///     Ok::<String, Error>("success".to_string())
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_session_refresh<R, F, Fut, T>(refresher: &R, mut operation: F) -> Result<T>
where
    R: SessionRefresher + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(e) if e.is_session_expired() => {
            tracing::warn!(error = %e, "session expired, refreshing credentials");

            match refresher.refresh_session().await {
                Ok(()) => {
                    let result = operation().await;
                    if result.is_ok() {
                        tracing::info!("Operation succeeded after credential refresh");
                    }
                    result
                }
                Err(refresh_err) => {
                    tracing::error!(
                        error = %e,
                        refresh_error = %refresh_err,
                        "credential refresh failed"
                    );
                    Err(Error::Auth(AuthError::RefreshFailed {
                        original: Box::new(e),
                        reason: refresh_err.to_string(),
                    }))
                }
            }
        }
        Err(e) => Err(e),
    }
}
