//! Observability for the DTE submission gateway.
//!
//! - **Logging**: structured `tracing` output, JSON in production and pretty in
//!   development, filtered through an `EnvFilter`.
//! - **Metrics**: Prometheus counters and histograms for submissions,
//!   contingency rewrites and failures.
//!
//! Contingency rewrites are additionally written to the
//! [`AUDIT_TARGET`](logging::AUDIT_TARGET) log target so they can be routed
//! to a separate sink.
//!
//! # Example
//!
//! ```rust,ignore
//! use dte_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("dte-gateway")
//!     .build();
//!
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, AUDIT_TARGET};
pub use metrics::{init_metrics, MetricsConfig, SubmissionLabel};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        metrics_enabled = config.metrics.enabled,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_everything_disabled() {
        let mut config = TelemetryConfig::builder().disable_metrics().build();
        config.logging.enabled = false;
        assert!(init_telemetry(&config).is_ok());
    }
}
