use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    clap::Subcommand,
    tubepost_config::TubepostConfig,
    tubepost_oauth::{
        AuthorizationRequest, Credential, CredentialProvider, CredentialStore, provider_from_config,
    },
};

use crate::app::credential_manager_with;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Authorize YouTube uploads now and store the credential.
    Login {
        /// Do not try to open the authorization URL in a browser.
        #[arg(long, default_value_t = false)]
        no_browser: bool,
    },
    /// Show whether a credential is stored and how long it stays valid.
    Status,
}

pub async fn handle_auth(action: AuthAction, config: &TubepostConfig) -> Result<()> {
    match action {
        AuthAction::Login { no_browser } => login(config, no_browser).await,
        AuthAction::Status => status(config),
    }
}

async fn login(config: &TubepostConfig, no_browser: bool) -> Result<()> {
    let mut provider = provider_from_config(&config.auth);
    if !no_browser {
        provider = Arc::new(BrowserOpener { inner: provider });
    }
    let manager = credential_manager_with(config, provider)?;
    let credential = manager.login().await?;

    println!("Authorized. Credential saved to {}", manager.store().path().display());
    println!("{}", describe(&credential, tubepost_common::now_ms()));
    Ok(())
}

fn status(config: &TubepostConfig) -> Result<()> {
    let store = CredentialStore::new(config.token_path());
    match store.load()? {
        None => {
            println!("No credential stored at {}", store.path().display());
            println!("Run `tubepost auth login` to authorize YouTube uploads.");
        },
        Some(credential) => {
            println!("Credential: {}", store.path().display());
            println!("{}", describe(&credential, tubepost_common::now_ms()));
        },
    }
    Ok(())
}

fn describe(credential: &Credential, now_ms: u64) -> String {
    let validity = match credential.expiry_date {
        None => "no recorded expiry (will refresh on next use)".to_string(),
        Some(expiry) if expiry <= now_ms => "access token expired".to_string(),
        Some(expiry) => {
            let mins = (expiry - now_ms) / 60_000;
            format!("access token valid for {mins} more minute(s)")
        },
    };
    let refresh = if credential.refresh_token.is_some() {
        "present"
    } else {
        "missing"
    };
    let scopes = credential.scopes().join(" ");
    format!("  {validity}\n  refresh token: {refresh}\n  scopes: {scopes}")
}

/// Opens the authorization URL in the default browser before handing over
/// to the configured provider.
struct BrowserOpener {
    inner: Arc<dyn CredentialProvider>,
}

#[async_trait]
impl CredentialProvider for BrowserOpener {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn authorization_code(
        &self,
        request: &AuthorizationRequest,
    ) -> tubepost_oauth::Result<String> {
        if open::that(&request.url).is_err() {
            eprintln!("Could not open a browser. Please visit:\n{}", request.url);
        }
        self.inner.authorization_code(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::Secret};

    fn credential(expiry_date: Option<u64>, refresh: bool) -> Credential {
        Credential {
            access_token: Secret::new("ya29.a0".into()),
            refresh_token: refresh.then(|| Secret::new("1//0g".into())),
            expiry_date,
            scope: Some("https://www.googleapis.com/auth/youtube.upload".into()),
            token_type: Some("Bearer".into()),
        }
    }

    #[test]
    fn describes_remaining_validity() {
        let text = describe(&credential(Some(1_000 + 30 * 60_000), true), 1_000);
        assert!(text.contains("valid for 30 more minute(s)"));
        assert!(text.contains("refresh token: present"));
        assert!(text.contains("youtube.upload"));
    }

    #[test]
    fn describes_expired_and_missing_refresh() {
        let text = describe(&credential(Some(500), false), 1_000);
        assert!(text.contains("expired"));
        assert!(text.contains("refresh token: missing"));
        assert!(describe(&credential(None, true), 1_000).contains("no recorded expiry"));
    }

    #[test]
    fn status_without_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TubepostConfig {
            token_path: Some(dir.path().join("token.json")),
            ..Default::default()
        };
        status(&config).unwrap();
    }
}
