use std::path::PathBuf;

use {
    tubepost_media::ValidationError, tubepost_oauth::AuthError, tubepost_youtube::PlatformError,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Why an upload did not produce a published video. The local file is kept
/// for every variant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("video file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("YouTube authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("upload completed but no video ID returned")]
    MissingVideoId,

    #[error("upload did not finish within {secs}s")]
    TimedOut { secs: u64 },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "file_not_found",
            Self::Validation(_) => "validation",
            Self::Auth(_) => "auth",
            Self::Platform(_) => "platform",
            Self::MissingVideoId => "missing_video_id",
            Self::TimedOut { .. } => "timed_out",
            Self::Io { .. } => "io",
        }
    }
}
