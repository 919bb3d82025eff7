//! Startup wiring from [`DteConfig`] to a running [`Server`].

use std::sync::Arc;

use dte_config::{ContingencyConfig, DteConfig};
use dte_dispatch::{
    ContingencyClassifier, ContingencyCode, ContingencyTable, DispatchEngine,
    DocumentKindDescriptor, RegistryBuilder, TableClassifier,
};
use dte_server::{HealthCheck, Server};

use crate::GatewayError;

/// Builds the contingency table described by the configuration.
///
/// Entries override the default table per cause; an entry without a reason
/// uses the failure message.
#[must_use]
pub fn contingency_table(config: &ContingencyConfig) -> ContingencyTable {
    let table = config
        .excluded_document_types
        .iter()
        .fold(ContingencyTable::default(), |table, document_type| {
            table.exclude(*document_type)
        });

    config.codes.iter().fold(table, |table, entry| {
        let code = match &entry.reason {
            Some(reason) => ContingencyCode::fixed(&entry.code, reason),
            None => ContingencyCode::from_failure_message(&entry.code),
        };
        table.with_code(entry.cause, code)
    })
}

/// Assembles registry, engine and server from configuration.
///
/// # Example
///
/// ```rust
/// use dte_gateway::prelude::*;
///
/// let mut gateway = Gateway::new(DteConfig::development());
/// gateway
///     .register(
///         "invoices",
///         DocumentKindDescriptor::new(
///             DocumentType::Invoice,
///             FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
///                 SubmissionOutcome::rejected(Failure::validation("not implemented"))
///             }),
///         )
///         .allow_contingency(true),
///     )
///     .unwrap();
///
/// let server = gateway.build().unwrap();
/// assert_eq!(server.engine().registry().len(), 1);
/// ```
pub struct Gateway {
    config: DteConfig,
    kinds: RegistryBuilder,
    classifier: Option<Arc<dyn ContingencyClassifier>>,
}

impl Gateway {
    /// Starts a gateway with no kinds registered.
    #[must_use]
    pub fn new(config: DteConfig) -> Self {
        Self {
            config,
            kinds: RegistryBuilder::new(),
            classifier: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DteConfig {
        &self.config
    }

    /// Registers a document kind.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Registry`] for a duplicate or empty route key.
    pub fn register(
        &mut self,
        route_key: impl AsRef<str>,
        descriptor: DocumentKindDescriptor,
    ) -> Result<&mut Self, GatewayError> {
        self.kinds.register(route_key, descriptor)?;
        Ok(self)
    }

    /// Uses `classifier` instead of the configured contingency table.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ContingencyClassifier) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Validates the configuration and freezes the registry into a server.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<Server, GatewayError> {
        self.config.validate()?;

        if self.kinds.is_empty() {
            tracing::warn!("No document kinds registered, every submission will be NotFound");
        }

        let classifier = self.classifier.unwrap_or_else(|| {
            Arc::new(TableClassifier::new(contingency_table(
                &self.config.contingency,
            )))
        });
        let engine = DispatchEngine::new(Arc::new(self.kinds.build()), classifier)
            .with_contingency_enabled(self.config.contingency.enabled);

        let health = HealthCheck::new(
            self.config.telemetry.service_name.clone(),
            env!("CARGO_PKG_VERSION"),
        );
        Ok(Server::new(engine, self.config.server).with_health(health))
    }

    /// Initializes telemetry, builds the server and serves until SIGINT or
    /// SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, telemetry or server error.
    pub async fn run(self) -> Result<(), GatewayError> {
        dte_telemetry::init_telemetry(&self.config.telemetry_config())?;
        self.build()?.run().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("kinds", &self.kinds.len())
            .field("custom_classifier", &self.classifier.is_some())
            .finish()
    }
}
