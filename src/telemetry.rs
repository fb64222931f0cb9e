//! Tracing and metrics initialisation for the host binary.

use std::path::Path;

use anyhow::{anyhow, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn level_filter(log_level: &str) -> tracing::Level {
    match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// JSON logs to stdout and to a daily-rolling file under `log_dir`.
pub fn init_tracing(log_level: &str, log_dir: &Path) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(log_dir, "script-host.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let level = level_filter(log_level);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::from_default_env().add_directive(level.into()));

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::from_default_env().add_directive(level.into()));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    // The writer thread flushes until the guard drops; keep it for the process lifetime.
    Box::leak(Box::new(guard));
    Ok(())
}

/// Installs the Prometheus recorder for the bridge counters.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_boxed_recorder(Box::new(recorder))
        .map_err(|err| anyhow!("failed to install metrics recorder: {err}"))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_defaults_to_info() {
        assert_eq!(level_filter("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(level_filter("warn"), tracing::Level::WARN);
        assert_eq!(level_filter("verbose"), tracing::Level::INFO);
    }
}
