//! Credential exchange (PKCE login and token refresh)
//!
//! This module provides:
//! - [`CodeVerifier`]: PKCE verifier/challenge generation
//! - [`Credentials`]: the shared, cloneable credential handle
//! - [`CredentialExchange`]: authorization-code and refresh grants against the token endpoint
//! - [`LoginFlow`]: the interactive login state machine
//!
//! Credentials are passed explicitly to whatever needs them; there is no
//! process-global session.

mod exchange;
mod login;
mod pkce;
mod state;

pub use exchange::{CredentialExchange, TokenResponse, TokenUser, client_hash_headers};
pub use login::{LoginFlow, LoginState, MAX_LOGIN_ATTEMPTS, extract_code};
pub use pkce::{CHALLENGE_METHOD, CodeVerifier};
pub use state::{CredentialState, Credentials};
