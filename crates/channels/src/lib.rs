//! Transport abstractions between a messaging channel and the posting flow.
//!
//! A channel delivers [`InboundMessage`]s (text and/or a lazily fetched
//! [`MediaAttachment`]) to an [`InboundHandler`] and exposes a
//! [`ChannelOutbound`] for replies.

pub mod error;
pub mod gating;
pub mod plugin;

pub use {
    error::{Error, Error as ChannelError, Result},
    gating::is_allowed,
    plugin::{
        BytesSource, ChannelOutbound, InboundHandler, InboundMessage, MediaAttachment, MediaKind,
        MediaSource,
    },
};
