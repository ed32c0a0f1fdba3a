//! Interactive authorization-code login
//!
//! The flow moves `Unauthenticated → Pending → Authenticated`:
//!
//! 1. [`LoginFlow::begin`] creates a fresh verifier and returns the URL the
//!    user opens in a browser.
//! 2. After logging in, the user copies the callback URL (it carries a
//!    `code` query parameter) and hands it to [`LoginFlow::complete`].
//! 3. The code and verifier are exchanged for tokens. A failed exchange keeps
//!    the flow pending and uses up one of [`MAX_LOGIN_ATTEMPTS`] attempts.

use crate::auth::exchange::CredentialExchange;
use crate::auth::pkce::{CHALLENGE_METHOD, CodeVerifier};
use crate::error::{AuthError, Error, Result};
use std::sync::Arc;

/// Number of failed code exchanges tolerated before giving up
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Client identifier sent with the authorization request
const LOGIN_CLIENT: &str = "pixiv-android";

/// Observable state of a [`LoginFlow`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginState {
    /// No authorization attempt is in progress
    Unauthenticated,
    /// Waiting for the callback URL of the current attempt
    Pending,
    /// Tokens were obtained
    Authenticated,
}

enum Phase {
    Unauthenticated,
    Pending(CodeVerifier),
    Authenticated,
}

/// Drives one authorization-code login
pub struct LoginFlow {
    exchange: Arc<CredentialExchange>,
    phase: Phase,
    failed_attempts: u32,
}

impl LoginFlow {
    /// Create a flow that installs tokens through `exchange`
    pub fn new(exchange: Arc<CredentialExchange>) -> Self {
        Self {
            exchange,
            phase: Phase::Unauthenticated,
            failed_attempts: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> LoginState {
        match self.phase {
            Phase::Unauthenticated => LoginState::Unauthenticated,
            Phase::Pending(_) => LoginState::Pending,
            Phase::Authenticated => LoginState::Authenticated,
        }
    }

    /// Code exchanges that may still fail before the flow gives up
    pub fn attempts_remaining(&self) -> u32 {
        MAX_LOGIN_ATTEMPTS.saturating_sub(self.failed_attempts)
    }

    /// Start (or restart) an authorization attempt
    ///
    /// Generates a new verifier, replacing any pending one, and returns the
    /// authorization URL embedding its challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AttemptsExhausted`] once every attempt has failed.
    pub fn begin(&mut self) -> Result<String> {
        if self.attempts_remaining() == 0 {
            return Err(Error::Auth(AuthError::AttemptsExhausted {
                attempts: self.failed_attempts,
            }));
        }

        let verifier = CodeVerifier::generate();
        let url = url::Url::parse_with_params(
            &self.exchange.auth_config().login_url,
            &[
                ("code_challenge", verifier.challenge().as_str()),
                ("code_challenge_method", CHALLENGE_METHOD),
                ("client", LOGIN_CLIENT),
            ],
        )?;

        self.phase = Phase::Pending(verifier);
        tracing::debug!(
            attempt = self.failed_attempts + 1,
            max_attempts = MAX_LOGIN_ATTEMPTS,
            "authorization attempt started"
        );
        Ok(url.into())
    }

    /// Finish the pending attempt with the callback URL copied from the browser
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoPendingAttempt`] if [`begin`](Self::begin) was not called
    /// - [`AuthError::MalformedCallback`] if no code can be extracted; this does
    ///   not use up an attempt and the caller may supply the URL again
    /// - the exchange error when the token endpoint refuses the code
    /// - [`AuthError::AttemptsExhausted`] when that was the last attempt
    pub async fn complete(&mut self, callback_url: &str) -> Result<()> {
        let verifier = match &self.phase {
            Phase::Pending(verifier) => verifier.clone(),
            _ => return Err(Error::Auth(AuthError::NoPendingAttempt)),
        };

        if self.attempts_remaining() == 0 {
            return Err(Error::Auth(AuthError::AttemptsExhausted {
                attempts: self.failed_attempts,
            }));
        }

        let code = extract_code(callback_url)?;

        match self.exchange.exchange_code(&code, &verifier).await {
            Ok(()) => {
                self.phase = Phase::Authenticated;
                tracing::info!("Login completed");
                Ok(())
            }
            Err(e) => {
                self.failed_attempts += 1;
                tracing::warn!(
                    error = %e,
                    attempt = self.failed_attempts,
                    max_attempts = MAX_LOGIN_ATTEMPTS,
                    "authorization code exchange failed"
                );

                if self.attempts_remaining() == 0 {
                    Err(Error::Auth(AuthError::AttemptsExhausted {
                        attempts: self.failed_attempts,
                    }))
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Extract the authorization code from a callback URL's query string
///
/// Accepts any URL shape the browser may show, including the app's custom
/// scheme (`pixiv://account/login?code=...`).
pub fn extract_code(callback_url: &str) -> Result<String> {
    let trimmed = callback_url.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty input"));
    }

    let url = url::Url::parse(trimmed).map_err(|e| malformed(&format!("not a URL: {e}")))?;

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| malformed("no code parameter in query string"))
}

fn malformed(reason: &str) -> Error {
    Error::Auth(AuthError::MalformedCallback {
        reason: reason.to_string(),
    })
}
