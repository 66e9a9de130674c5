use std::path::Path;

use {
    async_trait::async_trait,
    reqwest::{
        Body, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    },
    secrecy::{ExposeSecret, Secret},
    tokio_util::io::ReaderStream,
    tracing::{debug, info, instrument},
};

use crate::{
    Error, Result,
    types::{InsertedVideo, VideoMetadata},
};

pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com";

/// A video hosting API that can create a video from a local file.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn insert_video(
        &self,
        access_token: &Secret<String>,
        metadata: &VideoMetadata,
        file: &Path,
    ) -> Result<InsertedVideo>;
}

/// `videos.insert` over the resumable upload protocol: one request opens an
/// upload session, a second streams the file to the session URI.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    upload_base_url: String,
}

impl YouTubeClient {
    pub fn new(upload_base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), upload_base_url)
    }

    pub fn with_client(client: reqwest::Client, upload_base_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_base_url: upload_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn open_session(
        &self,
        access_token: &Secret<String>,
        metadata: &VideoMetadata,
        content_type: &str,
        size: u64,
    ) -> Result<String> {
        let url = format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.upload_base_url
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", size)
            .json(metadata)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::from_api_body(status.as_u16(), &body));
        }

        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or(Error::MissingUploadLocation)
    }
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_BASE_URL)
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    #[instrument(skip_all, fields(file = %file.display()))]
    async fn insert_video(
        &self,
        access_token: &Secret<String>,
        metadata: &VideoMetadata,
        file: &Path,
    ) -> Result<InsertedVideo> {
        let handle = tokio::fs::File::open(file)
            .await
            .map_err(|e| Error::file(file, e))?;
        let size = handle
            .metadata()
            .await
            .map_err(|e| Error::file(file, e))?
            .len();
        let content_type = content_type_for(file);

        let session_uri = self
            .open_session(access_token, metadata, content_type, size)
            .await?;
        debug!(size, content_type, "upload session opened");

        let resp = self
            .client
            .put(&session_uri)
            .bearer_auth(access_token.expose_secret())
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(handle)))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return Err(Error::from_api_body(status.as_u16(), &body));
        }

        let video: InsertedVideo = serde_json::from_str(&body)?;
        info!(video_id = video.id.as_deref().unwrap_or(""), size, "video uploaded");
        Ok(video)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
