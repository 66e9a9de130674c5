//! OAuth credential lifecycle for the YouTube upload target.
//!
//! [`CredentialManager`] hands out an access credential that is valid at call
//! time: it loads the persisted [`Credential`] through [`CredentialStore`],
//! refreshes it when expired, and falls back to interactive authorization
//! through a pluggable [`CredentialProvider`].

pub mod callback_server;
pub mod error;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod provider;
pub mod storage;
pub mod types;

pub use {
    callback_server::CallbackServer,
    error::{Error, Error as AuthError, Result},
    flow::{AuthorizationRequest, OAuthFlow},
    manager::{CredentialManager, CredentialSource},
    provider::{
        CallbackCodeProvider, CredentialProvider, PresetCodeProvider, TerminalCodeProvider,
        provider_from_config,
    },
    storage::CredentialStore,
    types::{Credential, OAuthConfig, PkceChallenge, serialize_option_secret, serialize_secret},
};
