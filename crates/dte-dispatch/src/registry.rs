//! The document-kind registry.
//!
//! # Matching
//!
//! Route keys and request paths are compared segment by segment, with empty
//! segments (leading, trailing or doubled slashes) ignored. A key matches a
//! path when its segments equal the trailing segments of the path, so `ccf`
//! matches `/api/v1/dte/ccf` but never `/api/v1/dte/ccf-old` or
//! `/dte/ccf/extra`.
//!
//! When several keys match, the one with the most segments wins. Keys of
//! equal length can only both match if they are identical, and duplicates are
//! refused at registration, so resolution never depends on insertion order.

use std::collections::BTreeMap;

use dte_core::Failure;
use thiserror::Error;

use crate::DocumentKindDescriptor;

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The route key is already taken.
    #[error("route key '{0}' is already registered")]
    DuplicateRouteKey(String),

    /// The route key has no segments.
    #[error("route key must contain at least one path segment, got '{0}'")]
    EmptyRouteKey(String),
}

/// Collects descriptors at startup.
///
/// # Example
///
/// ```rust
/// use dte_core::{DocumentType, Failure, FnUseCase, RequestContext, SubmissionOutcome};
/// use dte_dispatch::{DocumentKindDescriptor, RegistryBuilder};
///
/// fn kind(document_type: DocumentType) -> DocumentKindDescriptor {
///     DocumentKindDescriptor::new(
///         document_type,
///         FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
///             SubmissionOutcome::rejected(Failure::internal("not wired"))
///         }),
///     )
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register("dte/invoices", kind(DocumentType::Invoice)).unwrap();
/// assert!(builder.register("/dte/invoices/", kind(DocumentType::Invoice)).is_err());
///
/// let registry = builder.build();
/// assert_eq!(registry.resolve("/api/v1/dte/invoices").unwrap().route_key(), "dte/invoices");
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    kinds: BTreeMap<String, DocumentKindDescriptor>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under `route_key`.
    ///
    /// The key is normalized (empty segments dropped) before the duplicate
    /// check, so `/dte/ccf/` and `dte/ccf` are the same key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::DuplicateRouteKey` if the key is taken and
    /// `ConfigurationError::EmptyRouteKey` if it has no segments.
    pub fn register(
        &mut self,
        route_key: impl AsRef<str>,
        descriptor: DocumentKindDescriptor,
    ) -> Result<&mut Self, ConfigurationError> {
        let raw = route_key.as_ref();
        let key = segments(raw).collect::<Vec<_>>().join("/");
        if key.is_empty() {
            return Err(ConfigurationError::EmptyRouteKey(raw.to_string()));
        }
        if self.kinds.contains_key(&key) {
            return Err(ConfigurationError::DuplicateRouteKey(key));
        }

        tracing::debug!(
            route_key = %key,
            document_type = %descriptor.document_type(),
            allows_contingency = descriptor.allows_contingency(),
            "Registered document kind"
        );

        let descriptor = descriptor.with_route_key(key.clone());
        self.kinds.insert(key, descriptor);
        Ok(self)
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry { kinds: self.kinds }
    }
}

/// Immutable route key to descriptor mapping.
///
/// Shared behind an `Arc` by the engine and the server; nothing mutates it
/// after [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct Registry {
    kinds: BTreeMap<String, DocumentKindDescriptor>,
}

impl Registry {
    /// Resolves a request path to its descriptor.
    ///
    /// A key matches only when its segments are the last segments of the
    /// path: `ccf` resolves `/api/v1/dte/ccf` but not `/dte/ccf/extra`. Among
    /// matching keys the longest wins. Any query string is ignored.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` failure when no registered key matches.
    pub fn resolve(&self, path: &str) -> Result<&DocumentKindDescriptor, Failure> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let parts: Vec<&str> = segments(path).collect();

        // Longest suffix first; the first hit is the longest matching key.
        (0..parts.len())
            .find_map(|start| self.kinds.get(&parts[start..].join("/")))
            .ok_or_else(|| Failure::not_found(format!("Document type not supported: {path}")))
    }

    /// Looks up a descriptor by its exact (normalized) key.
    #[must_use]
    pub fn get(&self, route_key: &str) -> Option<&DocumentKindDescriptor> {
        self.kinds.get(route_key)
    }

    /// Iterates descriptors in route-key order.
    pub fn descriptors(&self) -> impl Iterator<Item = &DocumentKindDescriptor> {
        self.kinds.values()
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
