use std::path::PathBuf;

/// Attachment retrieval or staging failed.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to retrieve attachment: {0}")]
    Fetch(#[from] tubepost_channels::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// A file does not meet the requested publish format's constraints.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("could not determine video dimensions")]
    UnknownDimensions,

    #[error("could not determine video duration")]
    UnknownDuration,

    #[error("video must be vertical or square for Shorts (got {width}x{height})")]
    AspectRatio { width: u32, height: u32 },

    #[error("video must be {max} seconds or shorter for Shorts (got {seconds:.1}s)")]
    Duration { seconds: f64, max: f64 },

    #[error("could not inspect video: {message}")]
    Probe { message: String },
}

impl ValidationError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownDimensions => "unknown_dimensions",
            Self::UnknownDuration => "unknown_duration",
            Self::AspectRatio { .. } => "aspect_ratio",
            Self::Duration { .. } => "duration",
            Self::Probe { .. } => "probe",
        }
    }

    #[must_use]
    pub fn probe(message: impl std::fmt::Display) -> Self {
        Self::Probe {
            message: message.to_string(),
        }
    }
}
