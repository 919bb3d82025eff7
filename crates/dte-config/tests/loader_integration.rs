//! Loader tests against real files and the process environment.

use std::io::Write;

use dte_config::{ConfigError, ConfigLoader, LogFormat};
use dte_core::{DocumentType, TransmissionCause};
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_toml_file() {
    let file = config_file(
        ".toml",
        r#"
        [server]
        http_addr = "127.0.0.1:3000"
        base_path = "/facturacion/v2"

        [telemetry.logging]
        format = "pretty"

        [contingency]
        excluded_document_types = ["07"]

        [[contingency.codes]]
        cause = "timeout"
        code = "02"
        reason = "No disponibilidad del servicio"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    assert_eq!(config.server.base_path, "/facturacion/v2");
    assert_eq!(config.server.shutdown_timeout_secs, 30);
    assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    assert_eq!(config.contingency.excluded_document_types, vec![DocumentType::Retention]);
    assert_eq!(config.contingency.codes[0].cause, TransmissionCause::Timeout);
}

#[test]
fn loads_json_file() {
    let file = config_file(".json", r#"{"telemetry": {"service_name": "facturas"}}"#);
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.telemetry.service_name, "facturas");
}

#[test]
fn rejects_unknown_fields_in_file() {
    let file = config_file(
        ".toml",
        r#"
        [server]
        http_adr = "127.0.0.1:3000"
        "#,
    );
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn rejects_unsupported_extension() {
    let file = config_file(".yaml", "server: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn invalid_file_values_fail_validation() {
    let file = config_file(
        ".toml",
        r#"
        [[contingency.codes]]
        cause = "other"
        code = "5"
        "#,
    );
    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn env_overrides_file() {
    // The prefix is unique to this test so parallel tests never see it.
    std::env::set_var("DTELOADERTEST__SERVER__SHUTDOWN_TIMEOUT_SECS", "7");
    std::env::set_var("DTELOADERTEST__CONTINGENCY__ENABLED", "false");

    let file = config_file(
        ".toml",
        r#"
        [server]
        shutdown_timeout_secs = 60
        "#,
    );
    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("DTELOADERTEST")
        .load()
        .unwrap();

    assert_eq!(config.server.shutdown_timeout_secs, 7);
    assert!(!config.contingency.enabled);
}

#[test]
fn dotenv_file_feeds_overrides() {
    let env_file = config_file(".env", "DTEDOTENVTEST__TELEMETRY__SERVICE_NAME=from-dotenv\n");

    let config = ConfigLoader::new()
        .with_dotenv_file(env_file.path())
        .unwrap()
        .with_env_prefix("DTEDOTENVTEST")
        .load()
        .unwrap();

    assert_eq!(config.telemetry.service_name, "from-dotenv");
}

#[test]
fn missing_dotenv_file_is_an_error() {
    let result = ConfigLoader::new().with_dotenv_file("/nonexistent/.env");
    assert!(matches!(result, Err(ConfigError::DotenvError(_))));
}
