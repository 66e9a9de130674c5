//! Configuration loading, env substitution, and environment overrides.
//!
//! Config files: `tubepost.toml`, `tubepost.yaml`, or `tubepost.json`
//! Searched in `./` then `~/.config/tubepost/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, clear_config_dir, config_dir, discover_and_load, load_config,
        set_config_dir,
    },
    schema::{
        AuthConfig, CodeProviderKind, GoogleConfig, MediaConfig, MetricsConfig, TubepostConfig,
        UploadConfig, WhatsAppConfig,
    },
};
