//! Lazy download of attachment bytes from the sidecar's HTTP endpoint.

use {async_trait::async_trait, bytes::Bytes, tracing::debug};

use tubepost_channels::{Error, MediaSource, Result};

/// Fetches `GET {base}/media/{account_id}/{message_id}` on demand.
#[derive(Debug, Clone)]
pub struct SidecarMediaSource {
    client: reqwest::Client,
    url: String,
}

impl SidecarMediaSource {
    pub fn new(client: reqwest::Client, port: u16, account_id: &str, message_id: &str) -> Self {
        Self::with_base_url(client, &format!("http://127.0.0.1:{port}"), account_id, message_id)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        account_id: &str,
        message_id: &str,
    ) -> Self {
        Self {
            client,
            url: format!(
                "{}/media/{account_id}/{message_id}",
                base_url.trim_end_matches('/')
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MediaSource for SidecarMediaSource {
    async fn fetch(&self) -> Result<Bytes> {
        debug!(url = %self.url, "downloading attachment from sidecar");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::external("sidecar media request", e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::unavailable(format!(
                "sidecar media download returned {status}"
            )));
        }
        resp.bytes()
            .await
            .map_err(|e| Error::external("sidecar media body", e))
    }
}
