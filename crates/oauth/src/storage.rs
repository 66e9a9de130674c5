use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{Error, Result, types::Credential};

/// File-based credential storage for the single upload target.
///
/// Writes go to a sibling temp file that is renamed over the target, so the
/// last successful save is always fully readable.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted credential. `Ok(None)` when no file exists yet;
    /// an unreadable or unparsable file is an error, never silently absent.
    pub fn load(&self) -> Result<Option<Credential>> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "credential file not found");
                return Ok(None);
            },
            Err(e) => {
                return Err(Error::CorruptCredential {
                    path,
                    source: Box::new(e),
                });
            },
        };

        let credential: Credential =
            serde_json::from_str(&data).map_err(|e| Error::CorruptCredential {
                path: path.clone(),
                source: Box::new(e),
            })?;
        debug!(path = %path, "credential loaded");
        Ok(Some(credential))
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        let path = self.path.display().to_string();

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(credential)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(data.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        info!(path = %path, "credential saved");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}
