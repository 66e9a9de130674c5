use std::{collections::HashMap, sync::Arc};

use {
    axum::{Router, extract::Query, response::Html, routing::get},
    tokio::sync::oneshot,
    tracing::{info, warn},
    url::Url,
};

use crate::{Error, Result};

const RECEIVED_PAGE: &str = "<h1>Authorization received</h1><p>You can close this window.</p>";
const FAILED_PAGE: &str =
    "<h1>Authorization failed</h1><p>Check the terminal for details, then run the command again.</p>";

/// Serves the OAuth redirect once on localhost, then shuts down.
pub struct CallbackServer;

impl CallbackServer {
    /// Listen on `127.0.0.1` at the redirect URI's port and path for a GET
    /// carrying `code` and `state`. Validates `state` against `expected_state`
    /// and returns the authorization code. The caller bounds the wait.
    pub async fn wait_for_code(redirect_uri: &str, expected_state: String) -> Result<String> {
        let redirect = Url::parse(redirect_uri)
            .map_err(|source| Error::external("invalid redirect_uri", source))?;
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| Error::code_unavailable("redirect_uri has no usable port"))?;
        let path = match redirect.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let (tx, rx) = oneshot::channel::<Result<String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let app = Router::new().route(
            &path,
            get(move |Query(params): Query<HashMap<String, String>>| {
                let tx = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                async move {
                    let result = check_callback_params(&params, &expected_state);
                    let page = result_page(&result);
                    if let Some(tx) = tx {
                        let _ = tx.send(result);
                    }
                    Html(page)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        info!(port, path = %path, "waiting for OAuth redirect");
        let server = axum::serve(listener, app);

        tokio::select! {
            result = rx => {
                result.map_err(|_| Error::code_unavailable("callback channel closed"))?
            }
            _ = server.into_future() => {
                Err(Error::code_unavailable("callback server exited unexpectedly"))
            }
        }
    }
}

/// Fixed page for the browser. Request parameters never reach the HTML.
fn result_page(result: &Result<String>) -> &'static str {
    match result {
        Ok(_) => RECEIVED_PAGE,
        Err(e) => {
            warn!(error = %e, "OAuth callback rejected");
            FAILED_PAGE
        },
    }
}

fn check_callback_params(params: &HashMap<String, String>, expected_state: &str) -> Result<String> {
    if let Some(error) = params.get("error") {
        return Err(Error::code_unavailable(format!("authorization denied: {error}")));
    }
    let state = params
        .get("state")
        .ok_or_else(|| Error::code_unavailable("missing state"))?;
    if state != expected_state {
        return Err(Error::code_unavailable("state mismatch"));
    }
    params
        .get("code")
        .cloned()
        .ok_or_else(|| Error::code_unavailable("missing code"))
}
