//! Shared credential state

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Tokens and identity for the current session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialState {
    /// Bearer token for app API calls
    pub access_token: Option<String>,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// Whether a token exchange has succeeded in this process
    pub authenticated: bool,
    /// User id resolved by the last exchange
    pub user_id: Option<u64>,
}

impl std::fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialState")
            .field("access_token", &self.access_token.as_ref().map(|_| ".."))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| ".."))
            .field("authenticated", &self.authenticated)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Cloneable handle to the process-wide credential state
///
/// Readers always observe a complete token pair: updates replace the whole
/// state under the write lock. The generation counter increases on every
/// successful update so concurrent refreshers can tell whether someone else
/// already renewed the session.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    state: Arc<RwLock<CredentialState>>,
    generation: Arc<AtomicU64>,
}

impl Credentials {
    /// Create an unauthenticated handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle that already knows a refresh token
    pub fn with_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CredentialState {
                refresh_token: Some(refresh_token.into()),
                ..CredentialState::default()
            })),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> CredentialState {
        self.state.read().await.clone()
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// Current refresh token, if any
    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    /// Whether a token exchange has succeeded
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    /// Number of successful updates so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Install a new token pair and mark the session authenticated
    pub(crate) async fn install(
        &self,
        access_token: String,
        refresh_token: String,
        user_id: Option<u64>,
    ) {
        let mut state = self.state.write().await;
        let user_id = user_id.or(state.user_id);
        *state = CredentialState {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            authenticated: true,
            user_id,
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
