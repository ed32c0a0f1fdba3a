//! Credential refresh, login and idle tracking.

use crate::auth::{CredentialExchange, LoginFlow};
use crate::error::Result;
use std::sync::Arc;

use super::ArtworkDownloader;

impl ArtworkDownloader {
    /// Refresh the access token now
    ///
    /// Useful after a host notices repeated failures, or to validate a newly
    /// configured refresh token.
    pub async fn refresh_credentials(&self) -> Result<()> {
        match self.session.refresh_session().await {
            Ok(()) => {
                tracing::info!("Credentials refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Manual credential refresh failed");
                Err(e)
            }
        }
    }

    /// Token exchange shared with the API client, if this downloader owns one
    pub fn credential_exchange(&self) -> Option<Arc<CredentialExchange>> {
        self.exchange.clone()
    }

    /// Start an interactive login that installs tokens into this downloader
    ///
    /// Returns `None` for downloaders assembled with
    /// [`with_components`](ArtworkDownloader::with_components).
    pub fn login_flow(&self) -> Option<LoginFlow> {
        self.exchange.clone().map(LoginFlow::new)
    }

    /// Number of download tasks that have not finished yet
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every dispatched task has finished
    ///
    /// Tasks dispatched while waiting are waited for as well. This does not
    /// cancel anything.
    pub async fn wait_for_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
        tracing::debug!("all download tasks finished");
    }
}
