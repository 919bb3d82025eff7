//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use dte_core::DocumentType;
use serde_json::Value;

use crate::{ConfigError, DteConfig, LogFormat};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON, unknown fields rejected)
/// 3. `.env` file, if requested
/// 4. Environment variables `PREFIX__SECTION__KEY`
///
/// A file or string is laid over the current configuration: the keys it
/// sets replace the current values, everything it leaves out (a preset
/// included) is kept. Arrays are replaced as a whole.
///
/// # Example
///
/// ```no_run
/// use dte_config::ConfigLoader;
///
/// # fn main() -> Result<(), dte_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("dte.toml")?
///     .with_dotenv()?
///     .with_env_prefix("DTE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: DteConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DteConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use dte_config::{ConfigLoader, LogFormat};
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DteConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DteConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read, has
    /// an unsupported extension, or does not parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                )))
            }
        };

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.apply_layer(&content, format)?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unknown or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use dte_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     base_path = "/facturacion"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.base_path, "/facturacion");
    /// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let format = match format.to_lowercase().as_str() {
            "toml" => Format::Toml,
            "json" => Format::Json,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        self.apply_layer(content, format)?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// With prefix `DTE`:
    /// - `DTE__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `DTE__TELEMETRY__LOGGING__FORMAT=pretty`
    /// - `DTE__CONTINGENCY__EXCLUDED_DOCUMENT_TYPES=07,14`
    ///
    /// Contingency code overrides can only come from a file.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load `.env` from the working directory into the process environment,
    /// if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvError` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a specific env file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvError` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Apply overrides from explicit `KEY=value` pairs, as if they were
    /// environment variables under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvParseError` for a value that does not parse.
    pub fn with_overrides<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.to_uppercase();
        for (key, value) in vars {
            self.apply_env_var(key.as_ref(), value.as_ref(), &prefix)?;
        }
        Ok(self)
    }

    /// Finalize: apply environment overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value does not parse or the
    /// final configuration is invalid.
    pub fn load(mut self) -> Result<DteConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(key, _)| key.starts_with(&format!("{prefix}__")))
                .collect();
            self = self.with_overrides(&prefix, vars)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without applying environment overrides or validating.
    #[must_use]
    pub fn load_unvalidated(self) -> DteConfig {
        self.config
    }

    fn apply_layer(&mut self, content: &str, format: Format) -> Result<(), ConfigError> {
        // The typed parse reports unknown fields and bad values in the
        // source's own format before anything is merged.
        let layer: Value = match format {
            Format::Toml => {
                toml::from_str::<DteConfig>(content)?;
                toml::from_str(content)?
            }
            Format::Json => {
                serde_json::from_str::<DteConfig>(content)?;
                serde_json::from_str(content)?
            }
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Err(ConfigError::env_parse_error(key, "invalid key format"));
        };

        let parts: Vec<&str> = rest.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "BASE_PATH"] => config.server.base_path = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "BODY_TIMEOUT_MS"] => {
                config.server.body_timeout_ms = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => config.telemetry.metrics.addr = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = parse_flag(key, value)?;
            }

            ["CONTINGENCY", "ENABLED"] => config.contingency.enabled = parse_flag(key, value)?,
            ["CONTINGENCY", "EXCLUDED_DOCUMENT_TYPES"] => {
                config.contingency.excluded_document_types = value
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(|code| {
                        code.parse::<DocumentType>()
                            .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))
                    })
                    .collect::<Result<_, _>>()?;
            }

            _ => tracing::warn!(var = key, "Ignoring unknown configuration variable"),
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
}

/// Deep-merges `layer` into `base`; objects merge key by key, anything else
/// is replaced.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, DteConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"contingency": {"enabled": false}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert!(!config.contingency.enabled);
        assert_eq!(config.server.base_path, "/api/v1");
    }

    #[test]
    fn test_string_layers_over_preset() {
        let toml = r#"
            [server]
            base_path = "/facturacion"
        "#;
        let config = ConfigLoader::new()
            .with_development()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        let development = DteConfig::development();
        assert_eq!(config.server.base_path, "/facturacion");
        assert_eq!(config.server.http_addr, development.server.http_addr);
        assert_eq!(config.telemetry, development.telemetry);
    }

    #[test]
    fn test_layers_stack_in_order() {
        let config = ConfigLoader::new()
            .with_production()
            .with_string(r#"{"contingency": {"excluded_document_types": ["05", "07"]}}"#, "json")
            .unwrap()
            .with_string(
                r#"
                [contingency]
                excluded_document_types = ["14"]

                [telemetry.logging]
                level = "debug"
                "#,
                "toml",
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(
            config.contingency.excluded_document_types,
            vec![DocumentType::ExcludedSubjectInvoice]
        );
        assert_eq!(config.telemetry.logging.level, "debug");
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_merge_values_replaces_scalars_and_arrays() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": [1, 2]}, "d": true});
        merge_values(&mut base, serde_json::json!({"a": {"c": [3]}, "e": "new"}));
        assert_eq!(
            base,
            serde_json::json!({"a": {"b": 1, "c": [3]}, "d": true, "e": "new"})
        );
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        assert!(ConfigLoader::new().with_string("", "yaml").is_err());
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let toml = r#"
            [authorization]
            enabled = true
        "#;
        assert!(matches!(
            ConfigLoader::new().with_string(toml, "toml"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/dte.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/dte.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = ConfigLoader::new()
            .with_overrides(
                "dte",
                [
                    ("DTE__SERVER__BASE_PATH", "/facturacion"),
                    ("DTE__SERVER__MAX_BODY_BYTES", "1024"),
                    ("DTE__TELEMETRY__LOGGING__FORMAT", "PRETTY"),
                    ("DTE__TELEMETRY__METRICS__ENABLED", "off"),
                    ("DTE__CONTINGENCY__EXCLUDED_DOCUMENT_TYPES", "07, 14"),
                    ("DTE__SOMETHING__ELSE", "ignored"),
                ],
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.base_path, "/facturacion");
        assert_eq!(config.server.max_body_bytes, 1024);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert!(!config.telemetry.metrics.enabled);
        assert_eq!(
            config.contingency.excluded_document_types,
            vec![DocumentType::Retention, DocumentType::ExcludedSubjectInvoice]
        );
    }

    #[test]
    fn test_override_parse_errors() {
        let cases = [
            ("DTE__SERVER__BODY_TIMEOUT_MS", "soon"),
            ("DTE__CONTINGENCY__ENABLED", "maybe"),
            ("DTE__TELEMETRY__LOGGING__FORMAT", "xml"),
            ("DTE__CONTINGENCY__EXCLUDED_DOCUMENT_TYPES", "01,99"),
        ];
        for (key, value) in cases {
            let result = ConfigLoader::new().with_overrides("DTE", [(key, value)]);
            assert!(
                matches!(result, Err(ConfigError::EnvParseError { .. })),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn test_override_validated_on_load() {
        let result = ConfigLoader::new()
            .with_overrides("DTE", [("DTE__SERVER__BASE_PATH", "facturacion")])
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_unvalidated_skips_checks() {
        let config = ConfigLoader::new()
            .with_overrides("DTE", [("DTE__SERVER__HTTP_ADDR", "nowhere")])
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.server.http_addr, "nowhere");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
