//! # DTE Core
//!
//! Core types shared by every crate of the DTE submission gateway.
//!
//! This crate provides the vocabulary the dispatch engine speaks:
//!
//! - [`RequestContext`] - Per-request context carrying the request id and timing
//! - [`Failure`] - The four-way failure taxonomy (`Validation`, `Transmission`, `Internal`, `NotFound`)
//! - [`Artifact`] - A produced document and its [`IdentificationBlock`]
//! - [`SubmissionOutcome`] - `Accepted` or `Rejected`, with the partial artifact kept on rejection
//! - [`DocumentType`] - The authority's document-type taxonomy
//! - [`UseCase`] - The contract each document-kind handler implements

#![doc(html_root_url = "https://docs.rs/dte-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod artifact;
mod context;
mod document;
mod failure;
pub mod fixtures;
mod outcome;
mod use_case;

pub use artifact::{Artifact, IdentificationBlock, MAX_REASON_CHARS};
pub use context::{RequestContext, RequestId};
pub use document::{DocumentType, UnknownDocumentType};
pub use failure::{
    ErrorDetail, ErrorEnvelope, Failure, FailureKind, FailureResult, TransmissionCause,
};
pub use outcome::{ResponseOptions, SubmissionOutcome};
pub use use_case::{FnUseCase, UseCase};
