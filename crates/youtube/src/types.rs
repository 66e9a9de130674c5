use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

/// Metadata for `videos.insert`, in the API's `snippet`/`status` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub snippet: Snippet,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub privacy_status: PrivacyStatus,
}

impl VideoMetadata {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
        category_id: impl Into<String>,
        privacy_status: PrivacyStatus,
    ) -> Self {
        Self {
            snippet: Snippet {
                title: title.into(),
                description: description.into(),
                tags,
                category_id: category_id.into(),
            },
            status: Status { privacy_status },
        }
    }
}

/// The video resource returned by a completed upload. Only the fields the
/// caller needs are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsertedVideo {
    pub id: Option<String>,
}

pub fn shorts_url(video_id: &str) -> String {
    format!("https://www.youtube.com/shorts/{video_id}")
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_in_api_shape() {
        let meta = VideoMetadata::new(
            "Hello #shorts",
            "Hello\n#shorts",
            vec!["shorts".into(), "short".into()],
            "22",
            PrivacyStatus::Public,
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["snippet"]["categoryId"], "22");
        assert_eq!(json["snippet"]["tags"][1], "short");
        assert_eq!(json["status"]["privacyStatus"], "public");
    }

    #[test]
    fn urls() {
        assert_eq!(shorts_url("abc"), "https://www.youtube.com/shorts/abc");
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn inserted_video_ignores_extra_fields() {
        let v: InsertedVideo =
            serde_json::from_str(r#"{"kind":"youtube#video","id":"xyz","etag":"e"}"#).unwrap();
        assert_eq!(v.id.as_deref(), Some("xyz"));
    }
}
