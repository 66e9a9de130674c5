//! Config schema types.

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TubepostConfig {
    pub google: GoogleConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub upload: UploadConfig,
    pub whatsapp: WhatsAppConfig,
    pub metrics: MetricsConfig,
    /// Location of the persisted OAuth credential. Defaults to `token.json` in
    /// the config directory.
    pub token_path: Option<PathBuf>,
}

impl TubepostConfig {
    /// Resolved credential file location.
    pub fn token_path(&self) -> PathBuf {
        self.token_path.clone().unwrap_or_else(|| {
            crate::loader::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("token.json")
        })
    }
}

/// Google OAuth client settings for the YouTube Data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
    pub redirect_uri: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: DEFAULT_AUTH_URL.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            scopes: vec![YOUTUBE_UPLOAD_SCOPE.into()],
        }
    }
}

/// How the authorization code is obtained during interactive authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeProviderKind {
    /// Print the URL and read the pasted code from stdin.
    #[default]
    Terminal,
    /// Use a code supplied ahead of time (config or `TUBEPOST_AUTH_CODE`).
    Preset,
    /// Listen on the redirect URI's port for the browser redirect.
    Callback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub code_provider: CodeProviderKind,
    /// Pre-supplied authorization code for [`CodeProviderKind::Preset`].
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<Secret<String>>,
    /// Upper bound on waiting for an authorization code.
    pub code_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            code_provider: CodeProviderKind::default(),
            code: None,
            code_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Staging directory for received attachments.
    pub dir: PathBuf,
    /// `ffprobe` executable used for short-form validation.
    pub ffprobe: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("media"),
            ffprobe: "ffprobe".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upper bound on a whole upload (validation, credential, transfer).
    pub timeout_secs: u64,
    /// YouTube category id. 22 is "People & Blogs".
    pub category_id: String,
    pub upload_base_url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 900,
            category_id: "22".into(),
            upload_base_url: "https://www.googleapis.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub account_id: String,
    /// Directory where the sidecar keeps its WhatsApp session credentials.
    pub session_dir: PathBuf,
    pub sidecar_port: u16,
    pub sidecar_dir: Option<PathBuf>,
    /// Spawn the sidecar process instead of expecting one to be running.
    pub auto_start: bool,
    /// Phone numbers or JIDs (globs allowed) that may use the bot. Empty means everyone.
    pub allowlist: Vec<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            account_id: "default".into(),
            session_dir: PathBuf::from("auth"),
            sidecar_port: 9877,
            sidecar_dir: None,
            auto_start: true,
            allowlist: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Prometheus scrape address, e.g. `127.0.0.1:9464`.
    pub listen: Option<String>,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
