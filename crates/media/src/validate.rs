use std::{path::Path, sync::Arc};

use tracing::{debug, info};

#[cfg(feature = "metrics")]
use tubepost_metrics::{counter, media as media_metrics};

use crate::{
    error::ValidationError,
    probe::{MediaProbe, ProbeReport},
};

/// Longest clip YouTube accepts as a Short.
pub const MAX_SHORT_FORM_SECS: f64 = 60.0;

/// Apply the short-form rules to probed properties: width/height ≤ 1 and
/// duration ≤ [`MAX_SHORT_FORM_SECS`]. Unknown dimensions or duration reject.
pub fn check_short_form(report: &ProbeReport) -> Result<(), ValidationError> {
    let (Some(width), Some(height)) = (report.width, report.height) else {
        return Err(ValidationError::UnknownDimensions);
    };

    let seconds = report
        .duration_secs
        .ok_or(ValidationError::UnknownDuration)?;
    if seconds > MAX_SHORT_FORM_SECS {
        return Err(ValidationError::Duration {
            seconds,
            max: MAX_SHORT_FORM_SECS,
        });
    }

    // width / height <= 1 without float rounding
    if width > height {
        return Err(ValidationError::AspectRatio { width, height });
    }
    Ok(())
}

/// Checks staged files against publish format constraints.
#[derive(Clone)]
pub struct FormatValidator {
    probe: Arc<dyn MediaProbe>,
}

impl FormatValidator {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }

    pub async fn validate_short_form(&self, path: &Path) -> Result<(), ValidationError> {
        let report = self.probe.probe(path).await?;
        let result = check_short_form(&report);
        match &result {
            Ok(()) => debug!(path = %path.display(), ?report, "short-form check passed"),
            Err(e) => {
                info!(
                    path = %path.display(),
                    reason = e.reason(),
                    error = %e,
                    "short-form check rejected file"
                );
                #[cfg(feature = "metrics")]
                counter!(media_metrics::VALIDATION_REJECTIONS_TOTAL, "reason" => e.reason())
                    .increment(1);
            },
        }
        result
    }
}
