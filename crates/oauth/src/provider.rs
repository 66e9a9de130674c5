//! Sources for the authorization code during interactive authorization.

use std::sync::{Arc, Mutex};

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{info, warn},
    tubepost_config::{AuthConfig, CodeProviderKind},
    url::Url,
};

use crate::{Error, Result, callback_server::CallbackServer, flow::AuthorizationRequest};

/// Obtains the authorization code for a started authorization request.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String>;
}

/// Build the provider selected by `[auth].code_provider`.
pub fn provider_from_config(config: &AuthConfig) -> Arc<dyn CredentialProvider> {
    match config.code_provider {
        CodeProviderKind::Terminal => Arc::new(TerminalCodeProvider),
        CodeProviderKind::Preset => Arc::new(PresetCodeProvider::new(config.code.clone())),
        CodeProviderKind::Callback => Arc::new(CallbackCodeProvider),
    }
}

/// Prints the authorization URL and reads the code from stdin.
///
/// Accepts either the bare code or the full redirected URL pasted from the
/// browser's address bar.
pub struct TerminalCodeProvider;

#[async_trait]
impl CredentialProvider for TerminalCodeProvider {
    fn name(&self) -> &'static str {
        "terminal"
    }

    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        eprintln!("\nYouTube authorization required:");
        eprintln!("1. Visit this URL: {}", request.url);
        eprintln!("2. Complete the authorization");
        eprintln!("3. Paste the authorization code (or the full redirect URL) below");
        eprint!("\nAuthorization code: ");

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Err(Error::code_unavailable("stdin closed before a code was entered"));
        }
        extract_code(&line, &request.state)
    }
}

/// Hands out a code supplied ahead of time (config or `TUBEPOST_AUTH_CODE`).
///
/// Authorization codes are single use, so the code is consumed on first call.
pub struct PresetCodeProvider {
    code: Mutex<Option<Secret<String>>>,
}

impl PresetCodeProvider {
    pub fn new(code: Option<Secret<String>>) -> Self {
        Self {
            code: Mutex::new(code),
        }
    }
}

#[async_trait]
impl CredentialProvider for PresetCodeProvider {
    fn name(&self) -> &'static str {
        "preset"
    }

    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        let code = self
            .code
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| {
                Error::code_unavailable(
                    "no preset authorization code left; set TUBEPOST_AUTH_CODE and restart",
                )
            })?;
        info!(url = %request.url, "using preset authorization code");
        extract_code(code.expose_secret(), &request.state)
    }
}

/// Waits for the browser redirect on the redirect URI's localhost port.
pub struct CallbackCodeProvider;

#[async_trait]
impl CredentialProvider for CallbackCodeProvider {
    fn name(&self) -> &'static str {
        "callback"
    }

    async fn authorization_code(&self, request: &AuthorizationRequest) -> Result<String> {
        info!(url = %request.url, "open this URL to authorize YouTube uploads");
        eprintln!("Open this URL to authorize YouTube uploads:\n{}", request.url);
        CallbackServer::wait_for_code(&request.redirect_uri, request.state.clone()).await
    }
}

/// Pull the code out of user input, which may be the raw code or the whole
/// redirect URL. A `state` in a pasted URL must match.
fn extract_code(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::code_unavailable("empty authorization code"));
    }

    let Ok(url) = Url::parse(input) else {
        return Ok(input.to_string());
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" if value != expected_state => {
                warn!("pasted redirect URL carries a foreign state");
                return Err(Error::code_unavailable("state mismatch in pasted URL"));
            },
            "error" => {
                return Err(Error::code_unavailable(format!(
                    "authorization denied: {value}"
                )));
            },
            _ => {},
        }
    }
    code.ok_or_else(|| Error::code_unavailable("pasted URL has no code parameter"))
}
