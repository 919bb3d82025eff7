//! # DTE Gateway
//!
//! Submission gateway for electronic tax documents (DTE). Routes each
//! submission to the use case of its document kind and, when the authority
//! cannot be reached, accepts the document under contingency instead of
//! failing it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dte_gateway::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GatewayError> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("dte.toml")?
//!         .with_dotenv()?
//!         .with_env_prefix("DTE")
//!         .load()?;
//!
//!     let mut gateway = Gateway::new(config);
//!     gateway.register(
//!         "invoices",
//!         DocumentKindDescriptor::new(DocumentType::Invoice, CreateInvoice::new(client))
//!             .allow_contingency(true),
//!     )?;
//!
//!     gateway.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! HTTP → Server → DispatchEngine → Registry → UseCase
//!                       │                        │ Transmission failure
//!                       │                        ▼
//!                       └── Accepted ◀── Rewriter ◀── Classifier
//! ```

#![doc(html_root_url = "https://docs.rs/dte-gateway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;
mod error;

pub use bootstrap::{contingency_table, Gateway};
pub use error::GatewayError;

// Re-export core types
pub use dte_core as core;

// Re-export dispatch engine types
pub use dte_dispatch as dispatch;

// Re-export configuration types
pub use dte_config as config;

// Re-export telemetry types
pub use dte_telemetry as telemetry;

// Re-export server types
pub use dte_server as server;

/// Prelude module for convenient imports.
///
/// ```rust
/// use dte_gateway::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{contingency_table, Gateway, GatewayError};

    pub use dte_core::{
        Artifact, DocumentType, Failure, FailureKind, FnUseCase, RequestContext, RequestId,
        ResponseOptions, SubmissionOutcome, TransmissionCause, UseCase,
    };

    pub use dte_dispatch::{
        ContingencyClassifier, ContingencyCode, ContingencyDecision, ContingencyTable,
        DispatchEngine, DocumentKindDescriptor, Registry, RegistryBuilder, TableClassifier,
    };

    pub use dte_config::{ConfigLoader, DteConfig};

    pub use dte_server::{Server, ShutdownSignal};
}
