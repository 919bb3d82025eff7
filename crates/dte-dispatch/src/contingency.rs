//! Contingency classification.
//!
//! The authority allows documents to be issued locally, and transmitted
//! later, when its reception service cannot be reached. Whether a failed
//! transmission qualifies, and under which contingency type, is decided by a
//! [`ContingencyClassifier`].
//!
//! The shipped classifier, [`TableClassifier`], looks the failure's
//! [`TransmissionCause`] up in a [`ContingencyTable`]. The default table
//! follows the authority's contingency catalog:
//!
//! | Code | Meaning | Causes |
//! |------|---------|--------|
//! | `01` | Authority system unavailable | service unavailable, timeout, rate limited, scheduled maintenance |
//! | `03` | Issuer's Internet service failure | no connectivity |
//! | `05` | Other (reason is free text) | other |

use std::collections::{BTreeMap, BTreeSet};

use dte_core::{
    Artifact, DocumentType, Failure, FailureKind, TransmissionCause, MAX_REASON_CHARS,
};
use serde::{Deserialize, Serialize};

/// Reason used for free-text causes when the failure carries no message.
pub const FALLBACK_REASON: &str = "Falla en la transmisión al MH";

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContingencyDecision {
    /// The failure stays a failure.
    NotApplicable,
    /// The document may be accepted under contingency.
    Applicable {
        /// Two-digit contingency type code.
        contingency_type: String,
        /// Reason recorded in the document.
        reason: String,
    },
}

impl ContingencyDecision {
    /// Shorthand for [`ContingencyDecision::Applicable`].
    #[must_use]
    pub fn applicable(contingency_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Applicable {
            contingency_type: contingency_type.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`ContingencyDecision::Applicable`].
    #[must_use]
    pub const fn is_applicable(&self) -> bool {
        matches!(self, Self::Applicable { .. })
    }
}

/// Decides whether a rejected submission may be recovered as contingency.
///
/// Implementations must be pure and total: the same input always yields the
/// same decision and no input panics. Only `Transmission` failures can be
/// eligible, and a missing artifact is never eligible.
///
/// Closures with the matching signature implement this trait:
///
/// ```rust
/// use dte_core::{Artifact, DocumentType, Failure};
/// use dte_dispatch::{ContingencyClassifier, ContingencyDecision};
///
/// let never = |_: Option<&Artifact>, _: DocumentType, _: &Failure| ContingencyDecision::NotApplicable;
/// let decision = never.classify(None, DocumentType::Invoice, &Failure::internal("x"));
/// assert_eq!(decision, ContingencyDecision::NotApplicable);
/// ```
pub trait ContingencyClassifier: Send + Sync + 'static {
    /// Classifies one failure.
    fn classify(
        &self,
        artifact: Option<&Artifact>,
        document_type: DocumentType,
        failure: &Failure,
    ) -> ContingencyDecision;
}

impl<F> ContingencyClassifier for F
where
    F: Fn(Option<&Artifact>, DocumentType, &Failure) -> ContingencyDecision + Send + Sync + 'static,
{
    fn classify(
        &self,
        artifact: Option<&Artifact>,
        document_type: DocumentType,
        failure: &Failure,
    ) -> ContingencyDecision {
        self(artifact, document_type, failure)
    }
}

/// Where the contingency reason comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContingencyReason {
    /// A fixed reason text.
    Fixed(String),
    /// The failure message, truncated to [`MAX_REASON_CHARS`].
    FailureMessage,
}

/// Contingency type and reason for one transmission cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyCode {
    /// Two-digit contingency type code.
    pub code: String,
    /// Reason source.
    pub reason: ContingencyReason,
}

impl ContingencyCode {
    /// A code with a fixed reason.
    #[must_use]
    pub fn fixed(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: ContingencyReason::Fixed(reason.into()),
        }
    }

    /// A code whose reason is the failure message.
    #[must_use]
    pub fn from_failure_message(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: ContingencyReason::FailureMessage,
        }
    }

    fn reason_for(&self, failure: &Failure) -> String {
        match &self.reason {
            ContingencyReason::Fixed(reason) => reason.clone(),
            ContingencyReason::FailureMessage => {
                let message = failure.message().trim();
                if message.is_empty() {
                    FALLBACK_REASON.to_string()
                } else {
                    message.chars().take(MAX_REASON_CHARS).collect()
                }
            }
        }
    }
}

/// Transmission cause to contingency code mapping.
///
/// Causes without an entry are not eligible. Document types in the excluded
/// set are never eligible, whatever their descriptor says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    codes: BTreeMap<TransmissionCause, ContingencyCode>,
    excluded: BTreeSet<DocumentType>,
}

impl Default for ContingencyTable {
    fn default() -> Self {
        let unavailable = ContingencyCode::fixed("01", "No disponibilidad de sistema del MH");
        let mut codes = BTreeMap::new();
        codes.insert(TransmissionCause::ServiceUnavailable, unavailable.clone());
        codes.insert(TransmissionCause::Timeout, unavailable.clone());
        codes.insert(TransmissionCause::RateLimited, unavailable.clone());
        codes.insert(TransmissionCause::ScheduledMaintenance, unavailable);
        codes.insert(
            TransmissionCause::NoConnectivity,
            ContingencyCode::fixed(
                "03",
                "Falla en el suministro de servicio de Internet del Emisor",
            ),
        );
        codes.insert(
            TransmissionCause::Other,
            ContingencyCode::from_failure_message("05"),
        );

        Self {
            codes,
            excluded: BTreeSet::new(),
        }
    }
}

impl ContingencyTable {
    /// A table with no eligible causes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
            excluded: BTreeSet::new(),
        }
    }

    /// Sets or replaces the code for `cause`.
    #[must_use]
    pub fn with_code(mut self, cause: TransmissionCause, code: ContingencyCode) -> Self {
        self.codes.insert(cause, code);
        self
    }

    /// Makes `cause` ineligible.
    #[must_use]
    pub fn without_cause(mut self, cause: TransmissionCause) -> Self {
        self.codes.remove(&cause);
        self
    }

    /// Excludes a document type from contingency.
    #[must_use]
    pub fn exclude(mut self, document_type: DocumentType) -> Self {
        self.excluded.insert(document_type);
        self
    }

    /// Returns the code for `cause`, if eligible.
    #[must_use]
    pub fn code_for(&self, cause: TransmissionCause) -> Option<&ContingencyCode> {
        self.codes.get(&cause)
    }

    /// Returns `true` if `document_type` is excluded.
    #[must_use]
    pub fn is_excluded(&self, document_type: DocumentType) -> bool {
        self.excluded.contains(&document_type)
    }
}

/// Table-driven [`ContingencyClassifier`].
#[derive(Debug, Clone, Default)]
pub struct TableClassifier {
    table: ContingencyTable,
}

impl TableClassifier {
    /// Creates a classifier over `table`.
    #[must_use]
    pub const fn new(table: ContingencyTable) -> Self {
        Self { table }
    }

    /// Returns the table.
    #[must_use]
    pub const fn table(&self) -> &ContingencyTable {
        &self.table
    }
}

impl ContingencyClassifier for TableClassifier {
    fn classify(
        &self,
        artifact: Option<&Artifact>,
        document_type: DocumentType,
        failure: &Failure,
    ) -> ContingencyDecision {
        if failure.kind() != FailureKind::Transmission || artifact.is_none() {
            return ContingencyDecision::NotApplicable;
        }
        if self.table.is_excluded(document_type) {
            return ContingencyDecision::NotApplicable;
        }

        failure
            .cause()
            .and_then(|cause| self.table.code_for(cause))
            .map_or(ContingencyDecision::NotApplicable, |code| {
                ContingencyDecision::Applicable {
                    contingency_type: code.code.clone(),
                    reason: code.reason_for(failure),
                }
            })
    }
}
