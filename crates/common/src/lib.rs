//! Shared helpers used across all tubepost crates.

pub mod error;
pub mod time;

pub use {
    error::FromMessage,
    time::now_ms,
};
