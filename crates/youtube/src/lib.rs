//! YouTube Data API v3 client for video uploads.

pub mod client;
pub mod error;
pub mod types;

pub use {
    client::{DEFAULT_UPLOAD_BASE_URL, VideoPlatform, YouTubeClient},
    error::{Error, Error as PlatformError, Result},
    types::{InsertedVideo, PrivacyStatus, VideoMetadata, shorts_url, watch_url},
};
