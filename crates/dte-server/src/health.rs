//! Liveness endpoint.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `"healthy"` while the process answers.
    pub status: String,
    /// Service name from configuration.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server was created.
    pub uptime_seconds: u64,
}

/// Liveness reporter.
///
/// # Example
///
/// ```rust
/// use dte_server::HealthCheck;
///
/// let health = HealthCheck::new("dte-gateway", "0.1.0");
/// let status = health.status();
/// assert_eq!(status.status, "healthy");
/// assert_eq!(status.service, "dte-gateway");
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    started_at: Instant,
}

impl HealthCheck {
    /// Creates a reporter whose uptime starts now.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: self.version.clone(),
            uptime_seconds: self.uptime().as_secs(),
        }
    }

    /// Returns the time since creation.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new("dte-gateway", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let status = HealthCheck::new("svc", "1.2.3").status();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "svc");
        assert_eq!(json["version"], "1.2.3");
        assert_eq!(json["uptime_seconds"], 0);
    }

    #[test]
    fn test_default_reports_crate_version() {
        let health = HealthCheck::default();
        assert_eq!(health.service(), "dte-gateway");
        assert_eq!(health.status().version, env!("CARGO_PKG_VERSION"));
    }
}
