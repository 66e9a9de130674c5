//! Publishing a staged media file: validation, credential, platform call,
//! result URL and local cleanup.

pub mod error;
pub mod orchestrator;
pub mod request;

pub use {
    error::{Error, Error as UploadError, Result},
    orchestrator::{PublishedVideo, UploadOrchestrator},
    request::{PublishTarget, UploadRequest, derive_metadata},
};
