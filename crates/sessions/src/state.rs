use std::{fmt, path::PathBuf, str::FromStr};

/// Position of a sender in the posting flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Idle,
    AwaitingMedia,
    AwaitingDetails,
    ReadyToPost,
}

impl Step {
    pub fn of(state: Option<&SessionState>) -> Self {
        state.map_or(Self::Idle, SessionState::step)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishFormat {
    #[default]
    Shorts,
    Video,
}

impl PublishFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shorts => "shorts",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for PublishFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shorts" => Ok(Self::Shorts),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown YouTube format '{other}'")),
        }
    }
}

/// Whether and how to publish to YouTube.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub enabled: bool,
    pub format: PublishFormat,
}

/// A ReadyToPost state was requested without the fields it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("caption is empty")]
    EmptyCaption,
    #[error("YouTube publishing is not enabled")]
    PublishDisabled,
}

/// Conversation state of one sender. Each variant carries exactly the fields
/// valid in that step; Idle is the absence of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitingMedia {
        conversation_id: String,
    },
    AwaitingDetails {
        conversation_id: String,
        media_path: PathBuf,
    },
    ReadyToPost {
        conversation_id: String,
        media_path: PathBuf,
        caption: String,
        publish: PublishOptions,
    },
}

impl SessionState {
    pub fn awaiting_media(conversation_id: impl Into<String>) -> Self {
        Self::AwaitingMedia {
            conversation_id: conversation_id.into(),
        }
    }

    /// Build a ReadyToPost state. Requires a non-blank caption and enabled
    /// publishing.
    pub fn ready_to_post(
        conversation_id: impl Into<String>,
        media_path: PathBuf,
        caption: impl Into<String>,
        publish: PublishOptions,
    ) -> Result<Self, InvalidTransition> {
        let caption = caption.into();
        if caption.trim().is_empty() {
            return Err(InvalidTransition::EmptyCaption);
        }
        if !publish.enabled {
            return Err(InvalidTransition::PublishDisabled);
        }
        Ok(Self::ReadyToPost {
            conversation_id: conversation_id.into(),
            media_path,
            caption,
            publish,
        })
    }

    pub fn step(&self) -> Step {
        match self {
            Self::AwaitingMedia { .. } => Step::AwaitingMedia,
            Self::AwaitingDetails { .. } => Step::AwaitingDetails,
            Self::ReadyToPost { .. } => Step::ReadyToPost,
        }
    }

    pub fn conversation_id(&self) -> &str {
        match self {
            Self::AwaitingMedia { conversation_id }
            | Self::AwaitingDetails {
                conversation_id, ..
            }
            | Self::ReadyToPost {
                conversation_id, ..
            } => conversation_id,
        }
    }

    pub fn media_path(&self) -> Option<&PathBuf> {
        match self {
            Self::AwaitingMedia { .. } => None,
            Self::AwaitingDetails { media_path, .. } | Self::ReadyToPost { media_path, .. } => {
                Some(media_path)
            },
        }
    }
}
