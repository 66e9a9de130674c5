use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    tokio::sync::Mutex,
    tracing::{error, info, warn},
};

use crate::{
    Error, Result,
    flow::OAuthFlow,
    provider::CredentialProvider,
    storage::CredentialStore,
    types::Credential,
};

/// Anything that can hand out a credential valid for an immediate API call.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn valid_credential(&self) -> Result<Credential>;
}

/// Keeps the single upload credential valid across runs.
///
/// The whole check-expiry → refresh-or-authorize → persist sequence runs
/// under one async mutex, so concurrent uploads never race to write different
/// token generations.
pub struct CredentialManager {
    store: CredentialStore,
    flow: OAuthFlow,
    provider: Arc<dyn CredentialProvider>,
    code_timeout: Duration,
    lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        store: CredentialStore,
        flow: OAuthFlow,
        provider: Arc<dyn CredentialProvider>,
        code_timeout: Duration,
    ) -> Self {
        Self {
            store,
            flow,
            provider,
            code_timeout,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a credential whose access token is valid right now.
    ///
    /// Absent → interactive authorization. Expired → refresh, falling back to
    /// interactive authorization if the refresh fails. Otherwise returned as
    /// stored.
    pub async fn get_valid_credential(&self) -> Result<Credential> {
        let _guard = self.lock.lock().await;
        let now = tubepost_common::now_ms();

        let Some(current) = self.store.load()? else {
            info!("no stored credential, starting interactive authorization");
            return self.authorize().await;
        };

        if !current.is_expired(now) {
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("stored credential expired and has no refresh token");
            return self.authorize().await;
        };

        info!("refreshing expired YouTube credential");
        match self.flow.refresh(refresh_token.expose_secret()).await {
            Ok(fresh) => {
                let refreshed = current.refreshed_with(fresh);
                self.store.save(&refreshed)?;
                info!("YouTube credential refreshed");
                Ok(refreshed)
            },
            Err(e) => {
                warn!(error = %e, "token refresh failed, re-authorizing");
                self.authorize().await
            },
        }
    }

    /// Run interactive authorization unconditionally and persist the result.
    pub async fn login(&self) -> Result<Credential> {
        let _guard = self.lock.lock().await;
        self.authorize().await
    }

    async fn authorize(&self) -> Result<Credential> {
        let request = self.flow.start()?;
        info!(provider = self.provider.name(), "authorization code required");

        let code = tokio::time::timeout(
            self.code_timeout,
            self.provider.authorization_code(&request),
        )
        .await
        .map_err(|_| Error::CodeTimeout {
            secs: self.code_timeout.as_secs(),
        })
        .and_then(|r| r)
        .inspect_err(|e| error!(error = %e, "could not obtain authorization code"))?;

        let credential = self
            .flow
            .exchange(&code, &request.pkce.verifier)
            .await
            .inspect_err(|e| error!(error = %e, "authorization code exchange failed"))?;

        if credential.refresh_token.is_none() {
            error!("token exchange returned no refresh token");
            return Err(Error::MissingRefreshToken);
        }

        self.store.save(&credential)?;
        info!(scopes = ?credential.scopes(), "YouTube authorization complete");
        Ok(credential)
    }
}

#[async_trait]
impl CredentialSource for CredentialManager {
    async fn valid_credential(&self) -> Result<Credential> {
        self.get_valid_credential().await
    }
}
