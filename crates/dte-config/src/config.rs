//! Top-level configuration.

use std::collections::BTreeSet;
use std::net::SocketAddr;

use dte_core::MAX_REASON_CHARS;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, ContingencyConfig, LogFormat, LoggingConfig, ServerConfig,
    TelemetryConfigSection,
};

/// Complete gateway configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use dte_config::DteConfig;
///
/// let config = DteConfig::default();
/// assert_eq!(config.server.base_path, "/api/v1");
/// assert!(config.contingency.enabled);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DteConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,

    /// Contingency fallback configuration.
    #[serde(default)]
    pub contingency: ContingencyConfig,
}

impl DteConfig {
    /// Local development preset: pretty debug logs, no metrics exporter.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                http_addr: "127.0.0.1:8080".to_string(),
                shutdown_timeout_secs: 5,
                ..ServerConfig::default()
            },
            telemetry: TelemetryConfigSection {
                metrics: crate::MetricsConfig {
                    enabled: false,
                    ..crate::MetricsConfig::default()
                },
                logging: LoggingConfig {
                    level: "debug".to_string(),
                    format: LogFormat::Pretty,
                    include_location: true,
                    ..LoggingConfig::default()
                },
                ..TelemetryConfigSection::default()
            },
            contingency: ContingencyConfig::default(),
        }
    }

    /// Production preset: JSON logs at info, metrics on.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first field found invalid:
    /// - server or metrics address that is not a socket address
    /// - base path that does not start with `/`, ends with `/` or carries a
    ///   query
    /// - zero body timeout or body size
    /// - log filter that does not parse
    /// - contingency code that is not two digits, duplicate cause, or a
    ///   reason that is empty or too long
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        validate_base_path(&self.server.base_path)?;

        if self.server.body_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.body_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.telemetry.metrics.enabled
            && self.telemetry.metrics.addr.parse::<SocketAddr>().is_err()
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", self.telemetry.metrics.addr),
            ));
        }

        if let Err(e) = dte_telemetry::logging::create_env_filter(&self.telemetry.logging.level) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                e.to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.contingency.codes {
            let field = format!("contingency.codes[{}]", entry.cause);
            if !is_contingency_code(&entry.code) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("code must be two digits, got '{}'", entry.code),
                ));
            }
            if !seen.insert(entry.cause) {
                return Err(ConfigError::invalid_value(field, "duplicate cause"));
            }
            if let Some(reason) = &entry.reason {
                if reason.trim().is_empty() {
                    return Err(ConfigError::invalid_value(field, "reason must not be empty"));
                }
                if reason.chars().count() > MAX_REASON_CHARS {
                    return Err(ConfigError::invalid_value(
                        field,
                        format!("reason must not exceed {MAX_REASON_CHARS} characters"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Converts the telemetry section for `dte_telemetry::init_telemetry`.
    #[must_use]
    pub fn telemetry_config(&self) -> dte_telemetry::TelemetryConfig {
        let logging = &self.telemetry.logging;
        dte_telemetry::TelemetryConfig::builder()
            .service_name(self.telemetry.service_name.clone())
            .logging(dte_telemetry::LogConfig {
                enabled: logging.enabled,
                level: logging.level.clone(),
                json_format: logging.format == LogFormat::Json,
                file_line_info: logging.include_location,
                include_target: true,
            })
            .metrics(dte_telemetry::MetricsConfig {
                enabled: self.telemetry.metrics.enabled,
                addr: self.telemetry.metrics.addr.clone(),
            })
            .build()
    }
}

fn validate_base_path(base_path: &str) -> Result<(), ConfigError> {
    let reason = if !base_path.starts_with('/') {
        Some("must start with '/'")
    } else if base_path.len() > 1 && base_path.ends_with('/') {
        Some("must not end with '/'")
    } else if base_path.contains(['?', '#']) || base_path.contains(char::is_whitespace) {
        Some("must be a plain path without query, fragment or whitespace")
    } else if base_path.contains("//") {
        Some("must not contain empty segments")
    } else {
        None
    };

    reason.map_or(Ok(()), |reason| {
        Err(ConfigError::invalid_value("server.base_path", reason))
    })
}

fn is_contingency_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_digit())
}
