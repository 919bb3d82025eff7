//! # DTE Dispatch
//!
//! The generic dispatch engine of the submission gateway and its
//! contingency-fallback policy.
//!
//! ```text
//! path + body
//!     │
//!     ▼
//! ┌──────────┐  NotFound   ┌──────────┐  Validation  ┌───────────┐
//! │ Registry │────────────▶│ Decoding │─────────────▶│ Use case  │
//! └──────────┘             └──────────┘              └─────┬─────┘
//!                                                          │ Rejected(Transmission)
//!                                                          ▼
//!                                 ┌────────────┐  Applicable  ┌───────────┐
//!                                 │ Classifier │─────────────▶│ Rewriter  │──▶ Accepted
//!                                 └────────────┘              └───────────┘
//! ```
//!
//! - [`RegistryBuilder`] / [`Registry`] - route key to [`DocumentKindDescriptor`]
//! - [`DispatchEngine`] - runs one submission through the state machine
//! - [`ContingencyClassifier`] / [`ContingencyTable`] - decides contingency eligibility
//! - [`apply_contingency`] - records the decision in the identification block

#![doc(html_root_url = "https://docs.rs/dte-dispatch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contingency;
mod descriptor;
mod engine;
mod registry;
pub mod rewrite;

pub use contingency::{
    ContingencyClassifier, ContingencyCode, ContingencyDecision, ContingencyReason,
    ContingencyTable, TableClassifier,
};
pub use descriptor::{BoxedOutcome, DocumentKindDescriptor, ErasedUseCase};
pub use engine::{DispatchEngine, DispatchStage};
pub use registry::{ConfigurationError, Registry, RegistryBuilder};
pub use rewrite::{apply_contingency, RewriteError};
