use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a non-success status.
    #[error("YouTube API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("upload session response had no Location header")]
    MissingUploadLocation,

    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Build an [`Error::Api`] from a Google error body:
    /// `{"error": {"code": 403, "message": "...", "errors": [...]}}`.
    pub(crate) fn from_api_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .or_else(|| v["error"].as_str())
                    .map(ToString::to_string)
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.chars().take(300).collect()
                }
            });
        Self::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_message_is_extracted() {
        let body = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota.","errors":[{"reason":"quotaExceeded"}]}}"#;
        match Error::from_api_body(403, body) {
            Error::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("exceeded your quota"));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        let err = Error::from_api_body(502, "Bad Gateway");
        assert_eq!(err.to_string(), "YouTube API error (502): Bad Gateway");
    }

    #[test]
    fn empty_body_falls_back_to_status() {
        assert_eq!(
            Error::from_api_body(500, "").to_string(),
            "YouTube API error (500): HTTP 500"
        );
    }
}
