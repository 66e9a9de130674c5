use std::path::PathBuf;

use tubepost_youtube::{PrivacyStatus, VideoMetadata, shorts_url, watch_url};

const SHORTS_MARKER: &str = "#shorts";
const UNTITLED: &str = "Untitled Video";

/// Where a file gets published. YouTube is the only platform; the variant
/// carries the format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTarget {
    YouTubeShort,
    YouTubeVideo,
}

impl PublishTarget {
    pub fn is_short_form(self) -> bool {
        matches!(self, Self::YouTubeShort)
    }

    /// Public URL of an uploaded video.
    pub fn video_url(self, video_id: &str) -> String {
        match self {
            Self::YouTubeShort => shorts_url(video_id),
            Self::YouTubeVideo => watch_url(video_id),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::YouTubeShort => "shorts",
            Self::YouTubeVideo => "video",
        }
    }
}

/// One upload, consumed by [`crate::UploadOrchestrator::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub target: PublishTarget,
}

impl UploadRequest {
    pub fn is_short_form(&self) -> bool {
        self.target.is_short_form()
    }
}

/// Final title, description and tags as sent to the platform.
///
/// Shorts get the `#shorts` marker on the description and, unless already
/// present in any casing, on the title, plus the shorts tags.
pub fn derive_metadata(request: &UploadRequest, category_id: &str) -> VideoMetadata {
    let title = request.title.trim();
    let mut title = if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    };
    let description = request.description.trim_end();

    let (description, tags) = if request.is_short_form() {
        if !title.to_lowercase().contains(SHORTS_MARKER) {
            title = format!("{title} {SHORTS_MARKER}");
        }
        let description = if description.is_empty() {
            SHORTS_MARKER.to_string()
        } else {
            format!("{description}\n{SHORTS_MARKER}")
        };
        (description, vec!["shorts".to_string(), "short".to_string()])
    } else {
        (description.to_string(), Vec::new())
    };

    VideoMetadata::new(title, description, tags, category_id, PrivacyStatus::Public)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn request(title: &str, description: &str, target: PublishTarget) -> UploadRequest {
        UploadRequest {
            file_path: PathBuf::from("media/1.mp4"),
            title: title.into(),
            description: description.into(),
            target,
        }
    }

    #[test]
    fn short_form_gets_markers_and_tags() {
        let meta = derive_metadata(&request("Hello", "Hello", PublishTarget::YouTubeShort), "22");
        assert_eq!(meta.snippet.title, "Hello #shorts");
        assert_eq!(meta.snippet.description, "Hello\n#shorts");
        assert_eq!(meta.snippet.tags, vec!["shorts", "short"]);
        assert_eq!(meta.snippet.category_id, "22");
        assert_eq!(meta.status.privacy_status, PrivacyStatus::Public);
    }

    #[test]
    fn existing_marker_is_not_duplicated_in_title() {
        let meta = derive_metadata(
            &request("Trick shot #Shorts", "", PublishTarget::YouTubeShort),
            "22",
        );
        assert_eq!(meta.snippet.title, "Trick shot #Shorts");
        assert_eq!(meta.snippet.description, "#shorts");
    }

    #[test]
    fn standard_video_is_left_alone() {
        let meta = derive_metadata(&request("Vlog", "Day one", PublishTarget::YouTubeVideo), "22");
        assert_eq!(meta.snippet.title, "Vlog");
        assert_eq!(meta.snippet.description, "Day one");
        assert!(meta.snippet.tags.is_empty());
    }

    #[test]
    fn empty_title_becomes_untitled() {
        let meta = derive_metadata(&request("  ", "", PublishTarget::YouTubeVideo), "22");
        assert_eq!(meta.snippet.title, "Untitled Video");
    }

    #[test]
    fn urls_follow_target() {
        assert_eq!(
            PublishTarget::YouTubeShort.video_url("id1"),
            "https://www.youtube.com/shorts/id1"
        );
        assert_eq!(
            PublishTarget::YouTubeVideo.video_url("id1"),
            "https://www.youtube.com/watch?v=id1"
        );
    }
}
