//! Produced documents and their identification block.
//!
//! An [`Artifact`] is the document a use case built, held as an
//! order-preserving JSON object so the dispatch engine can treat every
//! document kind the same way. The authority's schema puts identity and
//! contingency metadata in a nested `identificacion` object, exposed here
//! read-only through [`IdentificationBlock`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Failure, FailureResult};

/// Field names of the identification block, as the authority spells them.
pub mod fields {
    /// The identification block itself.
    pub const IDENTIFICATION: &str = "identificacion";
    /// Contingency type code.
    pub const CONTINGENCY_TYPE: &str = "tipoContingencia";
    /// Contingency reason text.
    pub const CONTINGENCY_REASON: &str = "motivoContin";
    /// Generation code (UUID assigned by the issuer).
    pub const GENERATION_CODE: &str = "codigoGeneracion";
    /// Control number.
    pub const CONTROL_NUMBER: &str = "numeroControl";
    /// Document type code.
    pub const DOCUMENT_TYPE: &str = "tipoDte";
    /// Emission date.
    pub const EMISSION_DATE: &str = "fecEmi";
    /// Emission time.
    pub const EMISSION_TIME: &str = "horEmi";
}

/// Longest contingency reason the authority accepts in `motivoContin`.
pub const MAX_REASON_CHARS: usize = 500;

/// A document produced by a use case.
///
/// # Example
///
/// ```
/// use dte_core::Artifact;
/// use serde_json::json;
///
/// let artifact = Artifact::new(json!({
///     "identificacion": { "tipoDte": "01", "tipoContingencia": null }
/// }));
/// let ident = artifact.identification().unwrap();
/// assert_eq!(ident.document_type_code(), Some("01"));
/// assert!(ident.contingency_type().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(Value);

impl Artifact {
    /// Wraps an already-built JSON document.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Builds an artifact from any serializable document.
    ///
    /// Serialization failure is a defect in the use case's document type
    /// and is reported as [`FailureKind::Internal`](crate::FailureKind::Internal).
    pub fn from_serializable<T: Serialize>(document: &T) -> FailureResult<Self> {
        serde_json::to_value(document)
            .map(Self)
            .map_err(|e| Failure::internal_with_source("failed to serialize document", e))
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the artifact and returns the JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns the identification block if the artifact has one.
    #[must_use]
    pub fn identification(&self) -> Option<IdentificationBlock<'_>> {
        self.0
            .get(fields::IDENTIFICATION)
            .and_then(Value::as_object)
            .map(|fields| IdentificationBlock { fields })
    }

    /// Returns the identification block for in-place editing.
    ///
    /// Only the identification rewriter should need this.
    pub fn identification_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0
            .get_mut(fields::IDENTIFICATION)
            .and_then(Value::as_object_mut)
    }
}

impl From<Value> for Artifact {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Read-only view over an artifact's `identificacion` object.
#[derive(Debug, Clone, Copy)]
pub struct IdentificationBlock<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> IdentificationBlock<'a> {
    /// Returns a raw field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name)
    }

    /// Returns all fields in document order.
    #[must_use]
    pub fn fields(&self) -> &'a Map<String, Value> {
        self.fields
    }

    /// Returns the contingency type code, treating `null` as absent.
    #[must_use]
    pub fn contingency_type(&self) -> Option<&'a str> {
        self.text(fields::CONTINGENCY_TYPE)
    }

    /// Returns the contingency reason, treating `null` as absent.
    #[must_use]
    pub fn contingency_reason(&self) -> Option<&'a str> {
        self.text(fields::CONTINGENCY_REASON)
    }

    /// Returns `true` when a contingency type has been recorded.
    #[must_use]
    pub fn is_contingency(&self) -> bool {
        self.contingency_type().is_some()
    }

    /// Returns the generation code.
    #[must_use]
    pub fn generation_code(&self) -> Option<&'a str> {
        self.text(fields::GENERATION_CODE)
    }

    /// Returns the document type code.
    #[must_use]
    pub fn document_type_code(&self) -> Option<&'a str> {
        self.text(fields::DOCUMENT_TYPE)
    }

    /// Returns the emission date and time as written in the document.
    #[must_use]
    pub fn emitted_at(&self) -> Option<(&'a str, &'a str)> {
        Some((
            self.text(fields::EMISSION_DATE)?,
            self.text(fields::EMISSION_TIME)?,
        ))
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
