use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::TubepostConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "tubepost.toml",
    "tubepost.yaml",
    "tubepost.yml",
    "tubepost.json",
];

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the user-global config directory (from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

/// Drop a previously set config directory override.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Returns the user-global config directory.
///
/// Resolution order:
/// 1. programmatic override (`set_config_dir`)
/// 2. `TUBEPOST_CONFIG_DIR`
/// 3. `~/.config/tubepost`
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    if let Ok(dir) = std::env::var("TUBEPOST_CONFIG_DIR")
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "tubepost").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<TubepostConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./tubepost.{toml,yaml,yml,json}` (project-local)
/// 2. `<config_dir>/tubepost.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `TubepostConfig::default()` if no config file is found or it
/// fails to parse.
pub fn discover_and_load() -> TubepostConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                TubepostConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            TubepostConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Apply the well-known environment variables on top of file config.
///
/// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`,
/// `MEDIA_FOLDER`, `SESSION_FOLDER`, `TOKEN_PATH`, `TUBEPOST_AUTH_CODE`.
pub fn apply_env_overrides(config: &mut TubepostConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("GOOGLE_CLIENT_ID") {
        config.google.client_id = Some(v);
    }
    if let Some(v) = get("GOOGLE_CLIENT_SECRET") {
        config.google.client_secret = Some(Secret::new(v));
    }
    if let Some(v) = get("GOOGLE_REDIRECT_URI") {
        config.google.redirect_uri = Some(v);
    }
    if let Some(v) = get("MEDIA_FOLDER") {
        config.media.dir = PathBuf::from(v);
    }
    if let Some(v) = get("SESSION_FOLDER") {
        config.whatsapp.session_dir = PathBuf::from(v);
    }
    if let Some(v) = get("TOKEN_PATH") {
        config.token_path = Some(PathBuf::from(v));
    }
    if let Some(v) = get("TUBEPOST_AUTH_CODE") {
        config.auth.code = Some(Secret::new(v));
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<TubepostConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).context("invalid TOML config"),
        "yaml" | "yml" => serde_yaml::from_str(raw).context("invalid YAML config"),
        "json" => serde_json::from_str(raw).context("invalid JSON config"),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tubepost.toml");
        std::fs::write(
            &path,
            "token_path = \"/tmp/tok.json\"\n[upload]\ntimeout_secs = 60\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.token_path, Some(PathBuf::from("/tmp/tok.json")));
        assert_eq!(cfg.upload.timeout_secs, 60);
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("tubepost.yaml");
        std::fs::write(&yaml, "media:\n  dir: /srv/media\n").unwrap();
        assert_eq!(
            load_config(&yaml).unwrap().media.dir,
            PathBuf::from("/srv/media")
        );

        let json = dir.path().join("tubepost.json");
        std::fs::write(&json, r#"{"whatsapp": {"sidecar_port": 4000}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().whatsapp.sidecar_port, 4000);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tubepost.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = TubepostConfig::default();
        cfg.google.client_id = Some("from-file".into());

        apply_env_overrides(&mut cfg, |name| match name {
            "GOOGLE_CLIENT_ID" => Some("from-env".into()),
            "GOOGLE_CLIENT_SECRET" => Some("secret".into()),
            "MEDIA_FOLDER" => Some("/data/media".into()),
            "SESSION_FOLDER" => Some("   ".into()),
            _ => None,
        });

        assert_eq!(cfg.google.client_id.as_deref(), Some("from-env"));
        assert_eq!(
            cfg.google.client_secret.as_ref().map(|s| s.expose_secret().clone()),
            Some("secret".to_string())
        );
        assert_eq!(cfg.media.dir, PathBuf::from("/data/media"));
        // Blank values are ignored.
        assert_eq!(cfg.whatsapp.session_dir, PathBuf::from("auth"));
    }
}
