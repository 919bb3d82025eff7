//! Failure taxonomy for document submission.
//!
//! This module provides the [`Failure`] type. Every path through the dispatch
//! engine that does not end in an accepted document ends in a `Failure`, and
//! its [`FailureKind`] alone decides both whether contingency may be attempted
//! and which transport status the boundary reports.
//!
//! | `FailureKind` | Status | Contingency |
//! |---|---|---|
//! | `Validation` | 400 | never |
//! | `NotFound` | 404 | never |
//! | `Internal` | 500 | never |
//! | `Transmission` | 502 | when the kind allows it and the classifier agrees |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`Failure`].
pub type FailureResult<T> = Result<T, Failure>;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed or invalid input.
    Validation,
    /// Contacting the tax authority, or reading its answer, failed.
    Transmission,
    /// An invariant inside the gateway was violated. Indicates a defect.
    Internal,
    /// No document kind is registered for the requested route.
    NotFound,
}

impl FailureKind {
    /// Returns the HTTP status code the boundary reports for this kind.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Transmission => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Returns the stable `snake_case` label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Transmission => "transmission",
            Self::Internal => "internal",
            Self::NotFound => "not_found",
        }
    }

    /// Returns `true` only for [`FailureKind::Transmission`].
    #[must_use]
    pub const fn may_use_contingency(&self) -> bool {
        matches!(self, Self::Transmission)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transmission to the authority failed.
///
/// Use cases attach one of these to every [`FailureKind::Transmission`]
/// failure; the contingency classifier maps it to the authority's
/// contingency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionCause {
    /// The authority's reception service answered with an outage status.
    ServiceUnavailable,
    /// The request to the authority timed out.
    Timeout,
    /// The authority throttled the issuer.
    RateLimited,
    /// The issuer could not reach the network at all.
    NoConnectivity,
    /// The authority announced a maintenance window.
    ScheduledMaintenance,
    /// The authority processed the document and rejected it.
    AuthorityRejected,
    /// Anything else; the failure message explains it.
    Other,
}

impl TransmissionCause {
    /// All causes, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ServiceUnavailable,
        Self::Timeout,
        Self::RateLimited,
        Self::NoConnectivity,
        Self::ScheduledMaintenance,
        Self::AuthorityRejected,
        Self::Other,
    ];

    /// Returns the `snake_case` label, identical to the serde form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::NoConnectivity => "no_connectivity",
            Self::ScheduledMaintenance => "scheduled_maintenance",
            Self::AuthorityRejected => "authority_rejected",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransmissionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed submission failure.
///
/// # Example
///
/// ```
/// use dte_core::{Failure, FailureKind, TransmissionCause};
///
/// let failure = Failure::transmission(TransmissionCause::Timeout, "reception timed out");
/// assert_eq!(failure.kind(), FailureKind::Transmission);
/// assert_eq!(failure.cause(), Some(TransmissionCause::Timeout));
/// assert_eq!(failure.status_code().as_u16(), 502);
/// ```
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    cause: Option<TransmissionCause>,
    /// The underlying error (not exposed to clients).
    #[source]
    source: Option<anyhow::Error>,
}

impl Failure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            source: None,
        }
    }

    /// Creates a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Creates a not-found failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    /// Creates an internal failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Creates an internal failure chained to the error that caused it.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::new(FailureKind::Internal, message).with_source(source)
    }

    /// Creates a transmission failure with its cause.
    #[must_use]
    pub fn transmission(cause: TransmissionCause, message: impl Into<String>) -> Self {
        Self {
            cause: Some(cause),
            ..Self::new(FailureKind::Transmission, message)
        }
    }

    /// Attaches an underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the transmission cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<TransmissionCause> {
        self.cause
    }

    /// Returns the HTTP status code for this failure.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.default_status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self.kind {
            FailureKind::Validation => "VALIDATION_ERROR",
            FailureKind::Transmission => "TRANSMISSION_ERROR",
            FailureKind::Internal => "INTERNAL_ERROR",
            FailureKind::NotFound => "NOT_FOUND",
        }
    }

    /// Converts this failure to a serializable error envelope.
    ///
    /// The chained source is never included.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.message.clone(),
                category: self.kind,
                details: self
                    .cause
                    .map(|cause| serde_json::json!({ "cause": cause })),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Failure kind.
    pub category: FailureKind,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
