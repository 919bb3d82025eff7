//! Submission outcomes.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::{Artifact, Failure, FailureKind};

/// Auxiliary response data a use case wants the boundary to emit.
///
/// Headers are copied onto the transport response; extensions are merged
/// into the top level of the success body next to `data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseOptions {
    headers: BTreeMap<String, String>,
    extensions: Map<String, Value>,
}

impl ResponseOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a top-level field to the success body.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Returns the headers, ordered by name.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the body extensions.
    #[must_use]
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// Returns `true` if neither headers nor extensions are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.extensions.is_empty()
    }
}

/// Result of submitting one document.
///
/// A rejected submission may still carry the artifact the use case managed
/// to build before failing; contingency recovery depends on it.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The document was accepted (directly or through contingency).
    Accepted {
        /// The document to return to the caller.
        artifact: Artifact,
        /// Auxiliary response data.
        options: ResponseOptions,
    },
    /// The document was not accepted.
    Rejected {
        /// Whatever part of the document was built, if anything.
        artifact: Option<Artifact>,
        /// Auxiliary response data.
        options: ResponseOptions,
        /// Why the submission was rejected.
        failure: Failure,
    },
}

impl SubmissionOutcome {
    /// Shorthand for an accepted outcome.
    #[must_use]
    pub fn accepted(artifact: Artifact, options: ResponseOptions) -> Self {
        Self::Accepted { artifact, options }
    }

    /// Shorthand for a rejection without any artifact or options.
    #[must_use]
    pub fn rejected(failure: Failure) -> Self {
        Self::Rejected {
            artifact: None,
            options: ResponseOptions::default(),
            failure,
        }
    }

    /// Shorthand for a rejection that kept a partially built artifact.
    #[must_use]
    pub fn rejected_with_artifact(
        artifact: Artifact,
        options: ResponseOptions,
        failure: Failure,
    ) -> Self {
        Self::Rejected {
            artifact: Some(artifact),
            options,
            failure,
        }
    }

    /// Returns `true` for [`SubmissionOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the artifact, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Accepted { artifact, .. } => Some(artifact),
            Self::Rejected { artifact, .. } => artifact.as_ref(),
        }
    }

    /// Returns the response options.
    #[must_use]
    pub fn options(&self) -> &ResponseOptions {
        match self {
            Self::Accepted { options, .. } | Self::Rejected { options, .. } => options,
        }
    }

    /// Returns the failure of a rejected outcome.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { failure, .. } => Some(failure),
        }
    }

    /// Returns the failure kind of a rejected outcome.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(Failure::kind)
    }
}
