//! Typed configuration for the DTE submission gateway.
//!
//! - TOML and JSON configuration files
//! - `.env` files through `dotenvy`
//! - Environment variable overrides
//! - Strict parsing (unknown fields fail) and validation
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! base_path = "/api/v1"
//! shutdown_timeout_secs = 30
//! body_timeout_ms = 10000
//! max_body_bytes = 2097152
//!
//! [telemetry]
//! service_name = "dte-gateway"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [contingency]
//! enabled = true
//! excluded_document_types = ["07"]
//!
//! [[contingency.codes]]
//! cause = "timeout"
//! code = "01"
//! reason = "No disponibilidad de sistema del MH"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `DTE__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `DTE__TELEMETRY__LOGGING__LEVEL=dte_dispatch=debug,info`
//! - `DTE__CONTINGENCY__ENABLED=false`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::DteConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
