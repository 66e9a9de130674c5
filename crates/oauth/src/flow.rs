use {secrecy::{ExposeSecret, Secret}, tracing::debug, url::Url};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, oauth as oauth_metrics};

use crate::{
    Error, Result,
    pkce::{generate_pkce, generate_state},
    types::{Credential, OAuthConfig, PkceChallenge},
};

/// Authorization code flow (with PKCE) against the configured token endpoint.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

/// Result of starting the OAuth flow.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub pkce: PkceChallenge,
    pub state: String,
    pub redirect_uri: String,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Build the authorization URL and generate PKCE + state.
    pub fn start(&self) -> Result<AuthorizationRequest> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::FLOW_STARTS_TOTAL).increment(1);

        let pkce = generate_pkce();
        let state = generate_state();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|source| Error::external("invalid auth_url", source))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state);

        if !self.config.scopes.is_empty() {
            url.query_pairs_mut()
                .append_pair("scope", &self.config.scopes.join(" "));
        }

        for (key, value) in &self.config.extra_auth_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(AuthorizationRequest {
            url: url.to_string(),
            pkce,
            state,
            redirect_uri: self.config.redirect_uri.clone(),
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<Credential> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::CODE_EXCHANGE_TOTAL).increment(1);

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
            ("code_verifier", verifier),
        ];

        let result = self.post_token_form(&form).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(oauth_metrics::CODE_EXCHANGE_ERRORS_TOTAL).increment(1);
        }

        result
    }

    /// Refresh an access token. The returned credential carries no refresh
    /// token unless the server rotated it; merge with
    /// [`Credential::refreshed_with`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        #[cfg(feature = "metrics")]
        counter!(oauth_metrics::TOKEN_REFRESH_TOTAL).increment(1);

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
        ];

        let result = self.post_token_form(&form).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(oauth_metrics::TOKEN_REFRESH_FAILURES_TOTAL).increment(1);
        }

        result
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<Credential> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        if !status.is_success() {
            debug!(status = status.as_u16(), "token endpoint rejected request");
            return Err(Error::TokenEndpoint {
                status: status.as_u16(),
                message: token_error_message(&body),
            });
        }

        parse_token_response(&body, tubepost_common::now_ms())
    }
}

/// Google reports `{"error": "invalid_grant", "error_description": "..."}`.
fn token_error_message(body: &serde_json::Value) -> String {
    let error = body["error"].as_str();
    let description = body["error_description"].as_str();
    match (error, description) {
        (Some(e), Some(d)) => format!("{e}: {d}"),
        (Some(e), None) => e.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => "no error details".to_string(),
    }
}

fn parse_token_response(resp: &serde_json::Value, now_ms: u64) -> Result<Credential> {
    let access_token = resp["access_token"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(Error::MalformedTokenResponse {
            field: "access_token",
        })?
        .to_string();

    let expiry_date = resp["expires_in"]
        .as_u64()
        .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)));

    Ok(Credential {
        access_token: Secret::new(access_token),
        refresh_token: resp["refresh_token"]
            .as_str()
            .map(|s| Secret::new(s.to_string())),
        expiry_date,
        scope: resp["scope"].as_str().map(ToString::to_string),
        token_type: resp["token_type"].as_str().map(ToString::to_string),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::collections::HashMap};

    fn config(token_url: String) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-id".into(),
            client_secret: Secret::new("client-secret".into()),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url,
            redirect_uri: "http://localhost:8085/oauth2callback".into(),
            scopes: vec!["https://www.googleapis.com/auth/youtube.upload".into()],
            extra_auth_params: vec![
                ("access_type".into(), "offline".into()),
                ("prompt".into(), "consent".into()),
            ],
        }
    }

    #[test]
    fn start_builds_google_consent_url() {
        let flow = OAuthFlow::new(config("https://oauth2.googleapis.com/token".into()));
        let req = flow.start().unwrap();

        let url = Url::parse(&req.url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], req.state);
        assert_eq!(
            params["scope"],
            "https://www.googleapis.com/auth/youtube.upload"
        );
        assert!(!params.contains_key("client_secret"));
    }

    #[test]
    fn parse_computes_expiry_in_millis() {
        let body = serde_json::json!({
            "access_token": "a",
            "expires_in": 3599,
            "refresh_token": "r",
            "scope": "s",
            "token_type": "Bearer"
        });
        let cred = parse_token_response(&body, 1_000).unwrap();
        assert_eq!(cred.expiry_date, Some(1_000 + 3_599_000));
        assert!(cred.refresh_token.is_some());
    }

    #[test]
    fn parse_requires_access_token() {
        let body = serde_json::json!({"expires_in": 10});
        assert!(matches!(
            parse_token_response(&body, 0),
            Err(Error::MalformedTokenResponse {
                field: "access_token"
            })
        ));
    }

    #[tokio::test]
    async fn exchange_posts_secret_and_verifier() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "the-code".into()),
                mockito::Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), "verifier".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "access_token": "ya29.new",
                    "refresh_token": "1//refresh",
                    "expires_in": 3599,
                    "scope": "https://www.googleapis.com/auth/youtube.upload",
                    "token_type": "Bearer"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let flow = OAuthFlow::new(config(format!("{}/token", server.url())));
        let cred = flow.exchange("the-code", "verifier").await.unwrap();

        assert_eq!(cred.access_token.expose_secret(), "ya29.new");
        assert_eq!(
            cred.refresh_token.as_ref().map(|s| s.expose_secret().as_str()),
            Some("1//refresh")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_rejection_surfaces_google_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let flow = OAuthFlow::new(config(format!("{}/token", server.url())));
        let err = flow.refresh("stale").await.unwrap_err();
        match err {
            Error::TokenEndpoint { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("invalid_grant"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
