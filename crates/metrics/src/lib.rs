//! Metrics collection and export for tubepost.
//!
//! Library crates record through the `metrics` facade behind their own optional
//! `metrics` feature. When the `prometheus` feature is enabled here, the binary
//! can expose the recorded values on an HTTP scrape endpoint.
//!
//! ```rust,ignore
//! use tubepost_metrics::{counter, upload};
//!
//! counter!(upload::UPLOADS_TOTAL, "format" => "shorts").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
