//! Per-sender conversation state.
//!
//! One [`SessionState`] per sender, held in process memory. Absence of a
//! state means the sender is idle. Access goes through
//! [`SessionStore::lock`], which serializes everything done to one sender's
//! slot while leaving other senders untouched.

pub mod state;
pub mod store;

pub use {
    state::{InvalidTransition, PublishFormat, PublishOptions, SessionState, Step},
    store::{InMemorySessionStore, SessionGuard, SessionStore},
};
