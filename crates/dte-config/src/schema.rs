//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with defaults.

use dte_core::{DocumentType, TransmissionCause};
use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use dte_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:8080".to_string(),
///     base_path: "/api/v1".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Prefix in front of the `/dte/...` routes.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// How long a client may take to send the request body, in milliseconds.
    ///
    /// This never bounds the dispatch itself.
    #[serde(default = "default_body_timeout")]
    pub body_timeout_ms: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            base_path: default_base_path(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            body_timeout_ms: default_body_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_path() -> String {
    "/api/v1".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_body_timeout() -> u64 {
    10_000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus scrape endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info" or "dte_dispatch=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name reported in logs and by the health endpoint.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "dte-gateway".to_string()
}

/// One override of the contingency code table.
///
/// ```toml
/// [[contingency.codes]]
/// cause = "timeout"
/// code = "02"
/// reason = "No disponibilidad del servicio"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContingencyCodeEntry {
    /// Transmission cause this entry applies to.
    pub cause: TransmissionCause,

    /// Two-digit contingency type code.
    pub code: String,

    /// Fixed reason text. When absent the failure message is used.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Contingency configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContingencyConfig {
    /// Master switch for the contingency fallback.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Document types never accepted under contingency.
    #[serde(default)]
    pub excluded_document_types: Vec<DocumentType>,

    /// Overrides applied on top of the default code table.
    #[serde(default)]
    pub codes: Vec<ContingencyCodeEntry>,
}

impl Default for ContingencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_document_types: Vec::new(),
            codes: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}
