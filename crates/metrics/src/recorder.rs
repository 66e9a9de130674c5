//! Metrics recorder initialization and configuration.

use {anyhow::Result, tracing::info};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address for the Prometheus scrape endpoint (e.g. `127.0.0.1:9464`)
    pub listen: Option<std::net::SocketAddr>,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup. With the `prometheus` feature and a `listen` address,
/// this installs the Prometheus exporter with its own HTTP listener. Otherwise
/// the facade stays a no-op and every recorded value is discarded.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        init_prometheus(config)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: MetricsRecorderConfig) -> Result<()> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let Some(listen) = config.listen else {
        info!("metrics enabled without a listen address, skipping exporter");
        return Ok(());
    };

    let mut builder = PrometheusBuilder::new()
        .with_http_listener(listen)
        .set_buckets_for_metric(
            Matcher::Full(crate::upload::UPLOAD_DURATION_SECONDS.to_string()),
            crate::buckets::UPLOAD_DURATION,
        )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder.install()?;
    info!(%listen, "Prometheus metrics exporter listening");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_a_noop() {
        let config = MetricsRecorderConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(config).is_ok());
    }

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            crate::upload::UPLOADS_TOTAL,
            crate::oauth::TOKEN_REFRESH_TOTAL,
            crate::media::INGESTED_TOTAL,
            crate::conversation::EVENTS_TOTAL,
        ] {
            assert!(name.starts_with("tubepost_"), "{name}");
        }
    }
}
