//! Startup errors.

use thiserror::Error;

/// Anything that can stop the gateway from starting or serving.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] dte_config::ConfigError),

    /// A document kind could not be registered.
    #[error(transparent)]
    Registry(#[from] dte_dispatch::ConfigurationError),

    /// Logging or metrics could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] dte_telemetry::TelemetryError),

    /// The HTTP server failed.
    #[error(transparent)]
    Server(#[from] dte_server::ServerError),
}
