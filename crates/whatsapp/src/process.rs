//! Launching and stopping the Node.js sidecar.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    anyhow::{Context, Result, bail},
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        process::{Child, Command},
    },
    tracing::{debug, error, info, warn},
};

/// Overrides the sidecar directory search.
pub const SIDECAR_DIR_ENV: &str = "TUBEPOST_WHATSAPP_SIDECAR_DIR";

const SIDECAR_REL_PATH: &str = "sidecar/whatsapp-baileys";

/// A running sidecar. Killed when dropped.
pub struct SidecarProcess {
    child: Child,
    port: u16,
}

impl SidecarProcess {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Send SIGTERM and give the sidecar a few seconds to flush its session
    /// files before killing it.
    pub async fn stop(&mut self) -> Result<()> {
        info!("stopping WhatsApp sidecar process");

        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, kill},
                unistd::Pid,
            };

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill().await;
        }

        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => info!(?status, "WhatsApp sidecar process exited"),
            Ok(Err(e)) => warn!(error = %e, "error waiting for sidecar process"),
            Err(_) => {
                warn!("sidecar process did not exit gracefully, killing");
                let _ = self.child.kill().await;
            },
        }

        Ok(())
    }
}

/// How to launch the sidecar.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Directory containing the sidecar's `package.json`.
    pub sidecar_dir: PathBuf,
    pub port: u16,
    /// Where the sidecar persists the WhatsApp session.
    pub auth_dir: Option<PathBuf>,
}

/// Locate the sidecar checkout.
///
/// Searches, in order: the explicit path, `TUBEPOST_WHATSAPP_SIDECAR_DIR`,
/// `sidecar/whatsapp-baileys` next to the executable, then the same path
/// relative to the working directory and its parents.
pub fn find_sidecar_dir(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        if is_sidecar_dir(path) {
            return Ok(path.to_path_buf());
        }
        bail!(
            "sidecar directory does not exist or missing package.json: {}",
            path.display()
        );
    }

    if let Ok(dir) = std::env::var(SIDECAR_DIR_ENV) {
        let path = PathBuf::from(&dir);
        if is_sidecar_dir(&path) {
            return Ok(path);
        }
        warn!(path = %dir, "{SIDECAR_DIR_ENV} set but package.json not found");
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        for up in ["..", "../.."] {
            let candidate = exe_dir.join(up).join(SIDECAR_REL_PATH);
            if is_sidecar_dir(&candidate) {
                return Ok(candidate);
            }
        }
    }

    for prefix in [".", "..", "../.."] {
        let path = Path::new(prefix).join(SIDECAR_REL_PATH);
        if is_sidecar_dir(&path) {
            return Ok(path.canonicalize().unwrap_or(path));
        }
    }

    bail!(
        "WhatsApp sidecar not found. Set {SIDECAR_DIR_ENV} or ensure \
         {SIDECAR_REL_PATH} exists with package.json"
    )
}

fn is_sidecar_dir(path: &Path) -> bool {
    path.join("package.json").exists()
}

/// Build the sidecar if needed, then launch it with its logs forwarded to
/// tracing.
pub async fn start_sidecar(config: SidecarConfig) -> Result<SidecarProcess> {
    let sidecar_dir = &config.sidecar_dir;
    if !is_sidecar_dir(sidecar_dir) {
        bail!(
            "WhatsApp sidecar not found at {}. Run `cd {} && npm install && npm run build` first.",
            sidecar_dir.display(),
            sidecar_dir.display()
        );
    }

    if !sidecar_dir.join("dist/index.js").exists() {
        info!(path = %sidecar_dir.display(), "building WhatsApp sidecar");
        if !sidecar_dir.join("node_modules").exists() {
            run_npm(sidecar_dir, &["install"]).await?;
        }
        run_npm(sidecar_dir, &["run", "build"]).await?;
    }

    info!(
        path = %sidecar_dir.display(),
        port = config.port,
        "starting WhatsApp sidecar process"
    );

    let mut cmd = Command::new("node");
    cmd.arg("dist/index.js")
        .current_dir(sidecar_dir)
        .env("TUBEPOST_WHATSAPP_PORT", config.port.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(auth_dir) = &config.auth_dir {
        cmd.env("TUBEPOST_WHATSAPP_AUTH_DIR", auth_dir);
    }

    let mut child = cmd.spawn().context("failed to spawn sidecar process")?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                forward_log_line(&line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "whatsapp_sidecar", "{}", line);
            }
        });
    }

    // Catch immediate crashes (missing node, bad build) before connecting.
    tokio::time::sleep(Duration::from_millis(500)).await;
    match child.try_wait() {
        Ok(Some(status)) => bail!("sidecar process exited immediately with status: {status}"),
        Ok(None) => {},
        Err(e) => bail!("failed to check sidecar process status: {e}"),
    }

    info!(port = config.port, "WhatsApp sidecar process started");
    Ok(SidecarProcess {
        child,
        port: config.port,
    })
}

/// Map one line of pino JSON output onto a tracing level.
fn forward_log_line(line: &str) {
    if line.starts_with('{')
        && let Ok(log) = serde_json::from_str::<serde_json::Value>(line)
    {
        let msg = log.get("msg").and_then(|v| v.as_str()).unwrap_or(line);
        match log.get("level").and_then(|v| v.as_u64()).unwrap_or(30) {
            10 | 20 => debug!(target: "whatsapp_sidecar", "{}", msg),
            30 => info!(target: "whatsapp_sidecar", "{}", msg),
            40 => warn!(target: "whatsapp_sidecar", "{}", msg),
            _ => error!(target: "whatsapp_sidecar", "{}", msg),
        }
        return;
    }
    info!(target: "whatsapp_sidecar", "{}", line);
}

async fn run_npm(sidecar_dir: &Path, args: &[&str]) -> Result<()> {
    let label = args.join(" ");
    info!(path = %sidecar_dir.display(), "running npm {label} for sidecar");

    let output = Command::new("npm")
        .args(args)
        .current_dir(sidecar_dir)
        .output()
        .await
        .with_context(|| format!("failed to run npm {label}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("npm {label} failed: {stderr}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_must_contain_package_json() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_sidecar_dir(Some(dir.path())).is_err());

        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(find_sidecar_dir(Some(dir.path())).unwrap(), dir.path());
    }

    #[tokio::test]
    async fn start_rejects_missing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let err = start_sidecar(SidecarConfig {
            sidecar_dir: dir.path().join("nope"),
            port: 9877,
            auth_dir: None,
        })
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("npm install"));
    }
}
