//! # DTE Server
//!
//! HTTP front end of the submission gateway.
//!
//! - [`Server`] - Hyper listener, routing and body limits
//! - [`response`] - the response boundary mapping outcomes to HTTP
//! - [`HealthCheck`] - `GET /health`
//! - [`ShutdownSignal`] - graceful shutdown on SIGINT/SIGTERM
//!
//! Only body collection is bounded by a timeout. Once a submission reaches
//! the engine it runs to completion, so a slow authority call can still
//! come back with the partial document contingency needs.

#![doc(html_root_url = "https://docs.rs/dte-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod error;
mod health;
pub mod response;
mod server;
pub mod shutdown;

pub use catalog::{catalog, KindSummary};
pub use error::ServerError;
pub use health::{HealthCheck, HealthStatus};
pub use response::{HttpResponse, REQUEST_ID_HEADER};
pub use server::{Server, HEALTH_PATH};
pub use shutdown::ShutdownSignal;
