use std::{fmt, sync::Arc};

use {async_trait::async_trait, bytes::Bytes};

use crate::Result;

/// Send replies back through a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send a plain text message to a conversation (chat JID, chat id, ...).
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()>;
}

/// Receives messages a channel has accepted (after allowlist and self-filtering).
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage);
}

/// Lazily retrieves the raw bytes of an attachment.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self) -> Result<Bytes>;
}

/// Coarse attachment type as declared by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl MediaKind {
    /// Classify from a declared MIME type such as `image/png`.
    pub fn from_mime(mime: &str) -> Self {
        match mime.split('/').next().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("image") => Self::Image,
            Some(t) if t.eq_ignore_ascii_case("video") => Self::Video,
            Some(t) if t.eq_ignore_ascii_case("audio") => Self::Audio,
            Some(t) if t.eq_ignore_ascii_case("application") => Self::Document,
            _ => Self::Other,
        }
    }
}

/// An attachment descriptor: declared type plus a payload accessor.
#[derive(Clone)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub mime_type: Option<String>,
    pub source: Arc<dyn MediaSource>,
}

impl fmt::Debug for MediaAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAttachment")
            .field("kind", &self.kind)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// A message delivered by a channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Stable identity of the person who sent the message.
    pub sender: String,
    /// Where replies go. Equal to `sender` in direct chats.
    pub conversation_id: String,
    pub text: Option<String>,
    pub attachment: Option<MediaAttachment>,
}

impl InboundMessage {
    pub fn text(
        sender: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            conversation_id: conversation_id.into(),
            text: Some(text.into()),
            attachment: None,
        }
    }

    pub fn media(
        sender: impl Into<String>,
        conversation_id: impl Into<String>,
        attachment: MediaAttachment,
    ) -> Self {
        Self {
            sender: sender.into(),
            conversation_id: conversation_id.into(),
            text: None,
            attachment: Some(attachment),
        }
    }
}

/// In-memory payload, for attachments already downloaded (and for tests).
#[derive(Debug, Clone)]
pub struct BytesSource(pub Bytes);

#[async_trait]
impl MediaSource for BytesSource {
    async fn fetch(&self) -> Result<Bytes> {
        Ok(self.0.clone())
    }
}
