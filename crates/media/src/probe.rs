use std::path::Path;

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, instrument},
};

use crate::error::ValidationError;

/// Technical properties of a file's primary video stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeReport {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
}

/// Reads dimensions and duration from a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ValidationError>;
}

/// [`MediaProbe`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ValidationError> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ValidationError::probe(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(ValidationError::probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let report = parse_ffprobe_json(&output.stdout)?;
        debug!(?report, "probed media");
        Ok(report)
    }
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
///
/// Stream duration is preferred over container duration; both are decimal
/// strings in ffprobe's JSON.
pub(crate) fn parse_ffprobe_json(stdout: &[u8]) -> Result<ProbeReport, ValidationError> {
    let data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| ValidationError::probe(format!("unreadable ffprobe output: {e}")))?;

    let stream = &data["streams"][0];
    let dimension = |key: &str| {
        stream[key]
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
    };
    let seconds = |v: &serde_json::Value| {
        v.as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
    };

    Ok(ProbeReport {
        width: dimension("width"),
        height: dimension("height"),
        duration_secs: seconds(&stream["duration"]).or_else(|| seconds(&data["format"]["duration"])),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_portrait_clip() {
        let json = br#"{
            "streams": [{"codec_name": "h264", "width": 1080, "height": 1920, "duration": "42.033333"}],
            "format": {"duration": "42.100000"}
        }"#;
        let report = parse_ffprobe_json(json).unwrap();
        assert_eq!(report.width, Some(1080));
        assert_eq!(report.height, Some(1920));
        assert_eq!(report.duration_secs, Some(42.033333));
    }

    #[test]
    fn falls_back_to_container_duration() {
        let json = br#"{"streams": [{"width": 720, "height": 720}], "format": {"duration": "12.5"}}"#;
        assert_eq!(parse_ffprobe_json(json).unwrap().duration_secs, Some(12.5));
    }

    #[test]
    fn missing_video_stream_yields_empty_report() {
        let json = br#"{"streams": [], "format": {"duration": "3.0"}}"#;
        let report = parse_ffprobe_json(json).unwrap();
        assert_eq!(report.width, None);
        assert_eq!(report.height, None);
    }

    #[test]
    fn zero_dimensions_are_unknown() {
        let json = br#"{"streams": [{"width": 0, "height": 0}], "format": {}}"#;
        assert_eq!(parse_ffprobe_json(json).unwrap(), ProbeReport::default());
    }

    #[test]
    fn garbage_output_is_a_probe_error() {
        assert!(matches!(
            parse_ffprobe_json(b"not json"),
            Err(ValidationError::Probe { .. })
        ));
    }

    #[tokio::test]
    async fn missing_executable_is_a_probe_error() {
        let probe = FfprobeProbe::new("definitely-not-an-ffprobe-binary");
        let err = probe.probe(Path::new("/tmp/none.mp4")).await.unwrap_err();
        assert!(matches!(err, ValidationError::Probe { .. }));
    }
}
