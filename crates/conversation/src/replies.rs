//! User-facing reply texts.

use {
    crate::parse::DetailsError,
    tubepost_sessions::PublishFormat,
    tubepost_upload::UploadError,
};

pub const POST_COMMAND: &str = "post content";
pub const CONFIRM_COMMAND: &str = "confirm";
pub const CANCEL_COMMAND: &str = "cancel";

pub const UPLOAD_PROMPT: &str = "📎 Please upload an image or video file to continue.";

pub const DETAILS_TEMPLATE: &str = "📝 Now send your caption and YouTube details in this format:\n\n\
Caption: Your caption text here\n\
Youtube: Yes\n\
Youtube format: shorts/video";

pub const MEDIA_FAILED: &str = "❌ Failed to process media. Please try again.";

pub const MEDIA_NOT_FOUND: &str = "❌ Media file not found. Please start again with *post content*.";

pub const UPLOADING: &str = "🚀 Uploading to YouTube... This may take a moment.";

pub const CANCELLED: &str = "❌ Upload canceled. Start again by typing *post content*.";

pub fn details_error(error: &DetailsError) -> String {
    match error {
        DetailsError::MissingCaption => {
            "⚠️ Please include a caption in your message (e.g., `Caption: My cool video`).".into()
        },
        DetailsError::PublishNotEnabled => {
            "⚠️ You must enable YouTube to proceed (add `Youtube: Yes`).".into()
        },
        DetailsError::UnknownFormat(format) => format!(
            "⚠️ Unknown YouTube format `{format}`. Use `Youtube format: shorts` or `Youtube format: video`."
        ),
    }
}

pub fn ready_to_post(caption: &str, format: PublishFormat) -> String {
    format!(
        "✅ Got it!\n\n📄 Caption: *{caption}*\n📺 YouTube: Yes ({format})\n\nType *confirm* to post or *cancel* to discard."
    )
}

pub fn upload_complete(url: &str) -> String {
    format!("✅ Upload complete!\n\n📺 YouTube: {url}")
}

/// Failure reply. Authorization problems stay generic; their details go to
/// the log.
pub fn upload_failed(error: &UploadError) -> String {
    match error {
        UploadError::Auth(_) => {
            "❌ Upload failed: YouTube authorization is not available. Please contact the operator."
                .into()
        },
        other => format!("❌ Upload failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_to_post_echoes_caption_and_format() {
        let text = ready_to_post("Hello", PublishFormat::Shorts);
        assert!(text.contains("*Hello*"));
        assert!(text.contains("(shorts)"));
    }

    #[test]
    fn auth_failures_are_generic() {
        let err = UploadError::Auth(tubepost_oauth::AuthError::MissingRefreshToken);
        let text = upload_failed(&err);
        assert!(!text.contains(&err.to_string()));
        assert!(text.starts_with("❌ Upload failed"));
    }

    #[test]
    fn other_failures_carry_cause() {
        let text = upload_failed(&UploadError::MissingVideoId);
        assert_eq!(text, "❌ Upload failed: upload completed but no video ID returned");
    }
}
