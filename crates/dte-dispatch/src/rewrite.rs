//! Identification rewriting.
//!
//! Recording a contingency touches exactly two fields of the identification
//! block: `tipoContingencia` and `motivoContin`. Everything else, including
//! the generation code and emission timestamp the authority uses to identify
//! the document, is left as produced by the use case.

use dte_core::artifact::fields;
use dte_core::{Artifact, Failure};
use serde_json::Value;
use thiserror::Error;

/// Rewrite errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The use case returned no artifact to rewrite.
    #[error("no artifact was produced")]
    MissingArtifact,

    /// The artifact has no `identificacion` object.
    #[error("artifact has no identification block")]
    MissingIdentification,
}

impl From<RewriteError> for Failure {
    fn from(err: RewriteError) -> Self {
        Self::internal_with_source("Failed to record contingency in document", err)
    }
}

/// Returns a copy of `artifact` with the contingency fields set.
///
/// The input is not modified. Applying the same type and reason to an
/// already-rewritten artifact yields an equal artifact.
///
/// # Errors
///
/// Returns `RewriteError::MissingIdentification` if the artifact has no
/// identification object.
///
/// # Example
///
/// ```rust
/// use dte_core::fixtures;
/// use dte_dispatch::apply_contingency;
///
/// let original = fixtures::ccf_artifact();
/// let rewritten = apply_contingency(&original, "01", "No disponibilidad de sistema del MH").unwrap();
///
/// let ident = rewritten.identification().unwrap();
/// assert_eq!(ident.contingency_type(), Some("01"));
/// assert_eq!(ident.generation_code(), original.identification().unwrap().generation_code());
/// assert!(!original.identification().unwrap().is_contingency());
/// ```
pub fn apply_contingency(
    artifact: &Artifact,
    contingency_type: &str,
    reason: &str,
) -> Result<Artifact, RewriteError> {
    let mut rewritten = artifact.clone();
    let identification = rewritten
        .identification_mut()
        .ok_or(RewriteError::MissingIdentification)?;

    // Existing keys keep their position, so the serialized order is stable.
    identification.insert(
        fields::CONTINGENCY_TYPE.to_string(),
        Value::String(contingency_type.to_string()),
    );
    identification.insert(
        fields::CONTINGENCY_REASON.to_string(),
        Value::String(reason.to_string()),
    );

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::{fixtures, DocumentType, FailureKind};
    use serde_json::json;

    #[test]
    fn test_sets_only_contingency_fields() {
        let original = fixtures::credit_note_artifact();
        let rewritten = apply_contingency(&original, "03", "sin internet").unwrap();

        let mut expected = original.as_value().clone();
        expected["identificacion"]["tipoContingencia"] = json!("03");
        expected["identificacion"]["motivoContin"] = json!("sin internet");
        assert_eq!(rewritten.as_value(), &expected);
    }

    #[test]
    fn test_preserves_serialized_bytes_elsewhere() {
        let original = fixtures::invoice_artifact();
        let rewritten = apply_contingency(&original, "01", "caido").unwrap();

        let before = serde_json::to_string(original.as_value()).unwrap();
        let after = serde_json::to_string(rewritten.as_value()).unwrap();
        let before = before
            .replace(r#""tipoContingencia":null"#, r#""tipoContingencia":"01""#)
            .replace(r#""motivoContin":null"#, r#""motivoContin":"caido""#);
        assert_eq!(before, after);
    }

    #[test]
    fn test_original_untouched() {
        let original = fixtures::retention_artifact();
        let snapshot = original.clone();
        let _ = apply_contingency(&original, "05", "otro").unwrap();
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_idempotent() {
        let original = fixtures::artifact_for(DocumentType::CreditFiscalVoucher);
        let once = apply_contingency(&original, "01", "caido").unwrap();
        let twice = apply_contingency(&once, "01", "caido").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_adds_missing_fields() {
        let original = Artifact::new(json!({ "identificacion": { "tipoDte": "01" } }));
        let rewritten = apply_contingency(&original, "01", "caido").unwrap();
        let ident = rewritten.identification().unwrap();
        assert_eq!(ident.contingency_type(), Some("01"));
        assert_eq!(ident.contingency_reason(), Some("caido"));
        assert_eq!(ident.document_type_code(), Some("01"));
    }

    #[test]
    fn test_missing_identification() {
        let err = apply_contingency(&fixtures::artifact_without_identification(), "01", "x")
            .unwrap_err();
        assert_eq!(err, RewriteError::MissingIdentification);

        let failure = Failure::from(err);
        assert_eq!(failure.kind(), FailureKind::Internal);
    }

    #[test]
    fn test_identification_must_be_an_object() {
        let original = Artifact::new(json!({ "identificacion": "DTE-01" }));
        assert_eq!(
            apply_contingency(&original, "01", "x").unwrap_err(),
            RewriteError::MissingIdentification
        );
    }
}
