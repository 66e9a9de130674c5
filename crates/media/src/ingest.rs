use std::{
    io::ErrorKind,
    path::PathBuf,
};

use {
    tokio::io::AsyncWriteExt,
    tracing::{debug, info, warn},
    tubepost_channels::{MediaAttachment, MediaKind},
};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, media as media_metrics};

use crate::error::MediaError;

/// Name collisions within one millisecond are retried with a numeric suffix.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Pick the staging file extension from the declared attachment type.
pub fn extension_for(kind: MediaKind, mime_type: Option<&str>) -> &'static str {
    let mime = mime_type.unwrap_or_default().to_ascii_lowercase();
    match kind {
        MediaKind::Image if mime.contains("png") => "png",
        MediaKind::Image if mime.contains("jpeg") => "jpeg",
        MediaKind::Image => "jpg",
        MediaKind::Video if mime.contains("quicktime") => "mov",
        MediaKind::Video => "mp4",
        _ => "bin",
    }
}

/// Persists inbound attachments into the media staging directory.
#[derive(Debug, Clone)]
pub struct MediaIngestor {
    dir: PathBuf,
}

impl MediaIngestor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Fetch the attachment bytes and write them to `{unix_millis}.{ext}`.
    ///
    /// The directory is created on first use. Nothing is left on disk when the
    /// fetch fails.
    pub async fn ingest(&self, attachment: &MediaAttachment) -> Result<PathBuf, MediaError> {
        let result = self.ingest_inner(attachment).await;

        #[cfg(feature = "metrics")]
        match &result {
            Ok(_) => counter!(media_metrics::INGESTED_TOTAL).increment(1),
            Err(_) => counter!(media_metrics::INGEST_ERRORS_TOTAL).increment(1),
        }

        result
    }

    async fn ingest_inner(&self, attachment: &MediaAttachment) -> Result<PathBuf, MediaError> {
        let ext = extension_for(attachment.kind, attachment.mime_type.as_deref());
        let bytes = attachment.source.fetch().await?;
        debug!(
            kind = ?attachment.kind,
            mime = attachment.mime_type.as_deref().unwrap_or(""),
            bytes = bytes.len(),
            "attachment fetched"
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MediaError::write(&self.dir, e))?;

        let stem = tubepost_common::now_ms();
        let (path, mut file) = self.create_unique(stem, ext).await?;

        let written = async {
            file.write_all(&bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %rm, "failed to remove partial media file");
            }
            return Err(MediaError::write(path, e));
        }

        #[cfg(feature = "metrics")]
        counter!(media_metrics::INGESTED_BYTES_TOTAL).increment(bytes.len() as u64);

        info!(path = %path.display(), bytes = bytes.len(), "media stored");
        Ok(path)
    }

    async fn create_unique(
        &self,
        stem: u64,
        ext: &str,
    ) -> Result<(PathBuf, tokio::fs::File), MediaError> {
        let mut last_err = None;
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}-{attempt}.{ext}")
            };
            let path = self.dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => last_err = Some((path, e)),
                Err(e) => return Err(MediaError::write(path, e)),
            }
        }
        let (path, e) = last_err.unwrap_or_else(|| {
            (
                self.dir.clone(),
                std::io::Error::from(ErrorKind::AlreadyExists),
            )
        });
        Err(MediaError::write(path, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        bytes::Bytes,
        rstest::rstest,
        std::sync::Arc,
        tubepost_channels::{BytesSource, MediaSource},
    };

    struct FailingSource;

    #[async_trait]
    impl MediaSource for FailingSource {
        async fn fetch(&self) -> tubepost_channels::Result<Bytes> {
            Err(tubepost_channels::Error::unavailable("media expired"))
        }
    }

    fn attachment(kind: MediaKind, mime: &str, data: &'static [u8]) -> MediaAttachment {
        MediaAttachment {
            kind,
            mime_type: Some(mime.into()),
            source: Arc::new(BytesSource(Bytes::from_static(data))),
        }
    }

    #[rstest]
    #[case(MediaKind::Image, Some("image/png"), "png")]
    #[case(MediaKind::Image, Some("image/jpeg"), "jpeg")]
    #[case(MediaKind::Image, Some("image/webp"), "jpg")]
    #[case(MediaKind::Image, None, "jpg")]
    #[case(MediaKind::Video, Some("video/quicktime"), "mov")]
    #[case(MediaKind::Video, Some("video/mp4"), "mp4")]
    #[case(MediaKind::Video, Some("video/3gpp"), "mp4")]
    #[case(MediaKind::Audio, Some("audio/ogg"), "bin")]
    #[case(MediaKind::Document, Some("application/pdf"), "bin")]
    fn extension_rules(
        #[case] kind: MediaKind,
        #[case] mime: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(extension_for(kind, mime), expected);
    }

    #[tokio::test]
    async fn ingest_creates_dir_and_writes_payload() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestor = MediaIngestor::new(tmp.path().join("media"));

        let path = ingestor
            .ingest(&attachment(MediaKind::Image, "image/png", b"png-bytes"))
            .await
            .unwrap();

        assert_eq!(path.parent().unwrap(), tmp.path().join("media"));
        assert_eq!(path.extension().unwrap(), "png");
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert!(stem.parse::<u64>().is_ok(), "stem {stem} is a millis timestamp");
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn rapid_ingests_never_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestor = MediaIngestor::new(tmp.path());

        let mut paths = Vec::new();
        for _ in 0..5 {
            paths.push(
                ingestor
                    .ingest(&attachment(MediaKind::Video, "video/mp4", b"v"))
                    .await
                    .unwrap(),
            );
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
    }

    #[tokio::test]
    async fn fetch_failure_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestor = MediaIngestor::new(tmp.path().join("media"));
        let failing = MediaAttachment {
            kind: MediaKind::Video,
            mime_type: None,
            source: Arc::new(FailingSource),
        };

        let err = ingestor.ingest(&failing).await.unwrap_err();
        assert!(matches!(err, MediaError::Fetch(_)));
        assert!(!tmp.path().join("media").exists());
    }
}
