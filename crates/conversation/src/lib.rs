//! The chat-driven posting flow.
//!
//! `post content` → attachment → details → `confirm`. The
//! [`ConversationStateMachine`] applies one event at a time to the sender's
//! session; the [`InboundDispatcher`] feeds it from a per-sender queue so
//! events for one sender apply in arrival order while other senders proceed.

pub mod dispatcher;
pub mod machine;
pub mod parse;
pub mod replies;

pub use {
    dispatcher::{FallThrough, InboundDispatcher},
    machine::{ConversationStateMachine, Publisher},
    parse::{DetailsError, PostingDetails, parse_details},
};
