//! Media staging and technical checks: attachment ingest to the local media
//! directory, ffprobe-based probing, and short-form format validation.

pub mod error;
pub mod ingest;
pub mod probe;
pub mod validate;

pub use {
    error::{MediaError, ValidationError},
    ingest::{MediaIngestor, extension_for},
    probe::{FfprobeProbe, MediaProbe, ProbeReport},
    validate::{FormatValidator, MAX_SHORT_FORM_SECS, check_short_form},
};
