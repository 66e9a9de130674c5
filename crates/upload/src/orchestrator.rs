use std::{path::Path, sync::Arc, time::Duration};

use {
    tokio::time::Instant,
    tracing::{info, instrument, warn},
    tubepost_media::FormatValidator,
    tubepost_oauth::CredentialSource,
    tubepost_youtube::VideoPlatform,
};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, histogram, upload as upload_metrics};

use crate::{
    Error, Result,
    request::{UploadRequest, derive_metadata},
};

/// A video that is live on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub video_id: String,
    pub url: String,
}

/// Runs one upload end to end.
///
/// Order: file check, short-form validation, credential, metadata, transfer,
/// URL, local delete. Everything before the delete is bounded by `timeout`;
/// on any failure the local file stays where it is.
pub struct UploadOrchestrator {
    credentials: Arc<dyn CredentialSource>,
    platform: Arc<dyn VideoPlatform>,
    validator: FormatValidator,
    category_id: String,
    timeout: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        platform: Arc<dyn VideoPlatform>,
        validator: FormatValidator,
        category_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            credentials,
            platform,
            validator,
            category_id: category_id.into(),
            timeout,
        }
    }

    #[instrument(skip_all, fields(file = %request.file_path.display(), format = request.target.label()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<PublishedVideo> {
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.publish(&request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::TimedOut {
                secs: self.timeout.as_secs(),
            }),
        };

        #[cfg(feature = "metrics")]
        {
            let status = match &result {
                Ok(_) => "success",
                Err(e) => e.kind(),
            };
            counter!(
                upload_metrics::UPLOADS_TOTAL,
                "format" => request.target.label(),
                "status" => status
            )
            .increment(1);
            histogram!(upload_metrics::UPLOAD_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
        }

        match &result {
            Ok(video) => {
                info!(
                    video_id = %video.video_id,
                    url = %video.url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "upload complete"
                );
                remove_local_file(&request.file_path).await;
            },
            Err(e) => warn!(kind = e.kind(), error = %e, "upload failed, local file kept"),
        }
        result
    }

    async fn publish(&self, request: &UploadRequest) -> Result<PublishedVideo> {
        let path = request.file_path.as_path();
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            },
        };

        if request.is_short_form() {
            self.validator.validate_short_form(path).await?;
        }

        let credential = self.credentials.valid_credential().await?;
        let metadata = derive_metadata(request, &self.category_id);

        info!(
            bytes = size,
            title = %metadata.snippet.title,
            "starting YouTube upload"
        );
        let inserted = self
            .platform
            .insert_video(&credential.access_token, &metadata, path)
            .await?;

        let video_id = inserted
            .id
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingVideoId)?;

        #[cfg(feature = "metrics")]
        counter!(upload_metrics::UPLOADED_BYTES_TOTAL).increment(size);

        Ok(PublishedVideo {
            url: request.target.video_url(&video_id),
            video_id,
        })
    }
}

async fn remove_local_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "removed uploaded media file"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove uploaded media file"),
    }
}
