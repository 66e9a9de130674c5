use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tubepost_config::GoogleConfig,
};

use crate::{Error, Result};

/// Refresh this long before the recorded expiry so a token never lapses
/// mid-request.
pub const EXPIRY_MARGIN_MS: u64 = 60_000;

/// OAuth 2.0 client configuration for the upload target.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Extra query parameters to include in the authorization URL.
    pub extra_auth_params: Vec<(String, String)>,
}

impl OAuthConfig {
    /// Build from the `[google]` config section. Client id, secret, and
    /// redirect URI are mandatory.
    pub fn from_google(google: &GoogleConfig) -> Result<Self> {
        let client_id = google
            .client_id
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingClientConfig {
                field: "GOOGLE_CLIENT_ID",
            })?;
        let client_secret = google
            .client_secret
            .clone()
            .filter(|v| !v.expose_secret().is_empty())
            .ok_or(Error::MissingClientConfig {
                field: "GOOGLE_CLIENT_SECRET",
            })?;
        let redirect_uri = google
            .redirect_uri
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingClientConfig {
                field: "GOOGLE_REDIRECT_URI",
            })?;

        Ok(Self {
            client_id,
            client_secret,
            auth_url: google.auth_url.clone(),
            token_url: google.token_url.clone(),
            redirect_uri,
            scopes: google.scopes.clone(),
            // Offline access plus forced consent is what makes Google return a
            // refresh token on every interactive authorization.
            extra_auth_params: vec![
                ("access_type".into(), "offline".into()),
                ("prompt".into(), "consent".into()),
            ],
        })
    }
}

/// Persisted OAuth token material.
///
/// Field names match the JSON written by Google's client libraries so existing
/// `token.json` files load unchanged. Unknown fields are ignored.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<Secret<String>>,
    /// Expiry as Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<u64>,
    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Credential {
    /// Whether the access token must be refreshed before use at `now_ms`.
    ///
    /// A credential without a recorded expiry is treated as expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expiry_date
            .is_none_or(|expiry| expiry <= now_ms.saturating_add(EXPIRY_MARGIN_MS))
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Fold a refresh response into this credential. Google omits the refresh
    /// token on refresh, so the existing one is kept when absent.
    #[must_use]
    pub fn refreshed_with(self, fresh: Credential) -> Credential {
        Credential {
            access_token: fresh.access_token,
            refresh_token: fresh.refresh_token.or(self.refresh_token),
            expiry_date: fresh.expiry_date,
            scope: fresh.scope.or(self.scope),
            token_type: fresh.token_type.or(self.token_type),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiry_date", &self.expiry_date)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

/// Serialize a `Secret<String>` by exposing its inner value.
/// Use only for fields that must round-trip through storage (token JSON).
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Serialize an `Option<Secret<String>>` by exposing its inner value.
pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
