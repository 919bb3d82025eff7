//! Prometheus metrics for document submissions.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `dte_submissions_total` | Counter | `document_type`, `outcome` | Finished submissions |
//! | `dte_contingency_total` | Counter | `document_type`, `contingency_type` | Contingency rewrites |
//! | `dte_failures_total` | Counter | `kind` | Rejected submissions by failure kind |
//! | `dte_dispatch_duration_seconds` | Histogram | `document_type` | Engine latency |
//!
//! The recording functions go through the `metrics` facade, so they are
//! no-ops until [`init_metrics`] installs the Prometheus recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use dte_core::{DocumentType, FailureKind};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address the Prometheus scrape endpoint listens on.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// How a submission ended, as seen by the metrics.
///
/// The boundary reports both `Accepted` and `Contingency` as accepted
/// documents; only metrics and logs tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionLabel {
    /// Transmitted and accepted by the authority.
    Accepted,
    /// Accepted locally under contingency.
    Contingency,
    /// Rejected with a failure.
    Rejected,
}

impl SubmissionLabel {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Contingency => "contingency",
            Self::Rejected => "rejected",
        }
    }
}

/// Installs the Prometheus recorder and starts its scrape listener.
///
/// The listener runs on the current Tokio runtime, or on a background
/// thread when called outside one.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();
    tracing::info!(%addr, "Prometheus exporter listening");

    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        "dte_submissions_total",
        "Total number of finished document submissions"
    );
    describe_counter!(
        "dte_contingency_total",
        "Total number of documents accepted under contingency"
    );
    describe_counter!(
        "dte_failures_total",
        "Total number of rejected submissions by failure kind"
    );
    describe_histogram!(
        "dte_dispatch_duration_seconds",
        "Time spent dispatching a submission, use case included"
    );
}

/// Records a finished submission whose document kind was resolved.
pub fn record_submission(document_type: DocumentType, label: SubmissionLabel, duration: Duration) {
    counter!(
        "dte_submissions_total",
        "document_type" => document_type.code(),
        "outcome" => label.as_str()
    )
    .increment(1);

    histogram!(
        "dte_dispatch_duration_seconds",
        "document_type" => document_type.code()
    )
    .record(duration.as_secs_f64());
}

/// Records a contingency rewrite.
pub fn record_contingency(document_type: DocumentType, contingency_type: &str) {
    counter!(
        "dte_contingency_total",
        "document_type" => document_type.code(),
        "contingency_type" => contingency_type.to_string()
    )
    .increment(1);
}

/// Records a rejected submission.
pub fn record_failure(kind: FailureKind) {
    counter!("dte_failures_total", "kind" => kind.as_str()).increment(1);
}
