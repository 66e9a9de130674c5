use std::error::Error as StdError;

/// Authorization failures. Every variant requires operator attention; users
/// only ever see a generic message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required OAuth client setting is not configured.
    #[error("missing OAuth client setting: {field}")]
    MissingClientConfig { field: &'static str },

    /// The token endpoint rejected a code exchange or refresh.
    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    /// The token response lacked a field we depend on.
    #[error("token response missing {field}")]
    MalformedTokenResponse { field: &'static str },

    /// Interactive authorization returned no refresh token.
    #[error(
        "no refresh token received; revoke the app's access and authorize again with prompt=consent"
    )]
    MissingRefreshToken,

    /// No authorization code could be obtained from the configured provider.
    #[error("authorization code unavailable: {message}")]
    CodeUnavailable { message: String },

    /// Waiting for the authorization code exceeded the configured limit.
    #[error("timed out after {secs}s waiting for an authorization code")]
    CodeTimeout { secs: u64 },

    /// The persisted credential exists but cannot be read or parsed.
    #[error("credential file {path} is unreadable: {source}")]
    CorruptCredential {
        path: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapped source error from an external dependency.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn code_unavailable(message: impl Into<String>) -> Self {
        Self::CodeUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
