//! Document-kind descriptors and use-case type erasure.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use dte_core::{DocumentType, Failure, RequestContext, SubmissionOutcome, UseCase};

/// A boxed use-case execution.
pub type BoxedOutcome = Pin<Box<dyn Future<Output = SubmissionOutcome> + Send>>;

/// A type-erased use case.
///
/// Decoding happens synchronously when the closure is called, so a decode
/// error comes back as `Err` before anything executes; `Ok` carries the
/// pending use-case invocation.
pub type ErasedUseCase =
    Arc<dyn Fn(RequestContext, Bytes) -> Result<BoxedOutcome, Failure> + Send + Sync>;

/// Everything the engine needs to process one document kind.
///
/// Built once at startup and handed to
/// [`RegistryBuilder::register`](crate::RegistryBuilder::register), which
/// assigns the route key. Immutable afterwards.
///
/// # Example
///
/// ```rust
/// use dte_core::{DocumentType, Failure, FnUseCase, RequestContext, SubmissionOutcome};
/// use dte_dispatch::DocumentKindDescriptor;
///
/// let descriptor = DocumentKindDescriptor::new(
///     DocumentType::Invoice,
///     FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
///         SubmissionOutcome::rejected(Failure::validation("no items"))
///     }),
/// )
/// .allow_contingency(true)
/// .with_title("Factura electrónica");
///
/// assert!(descriptor.allows_contingency());
/// assert_eq!(descriptor.document_type().code(), "01");
/// ```
#[derive(Clone)]
pub struct DocumentKindDescriptor {
    route_key: String,
    document_type: DocumentType,
    allows_contingency: bool,
    title: String,
    description: String,
    request_shape: &'static str,
    use_case: ErasedUseCase,
}

impl DocumentKindDescriptor {
    /// Creates a descriptor around a use case.
    ///
    /// Contingency is not allowed until [`allow_contingency`](Self::allow_contingency)
    /// says so.
    #[must_use]
    pub fn new<U: UseCase>(document_type: DocumentType, use_case: U) -> Self {
        Self {
            route_key: String::new(),
            document_type,
            allows_contingency: false,
            title: document_type.name().to_string(),
            description: String::new(),
            request_shape: std::any::type_name::<U::Request>(),
            use_case: erase(use_case),
        }
    }

    /// Sets whether transmission failures may be recovered as contingency.
    #[must_use]
    pub fn allow_contingency(mut self, allowed: bool) -> Self {
        self.allows_contingency = allowed;
        self
    }

    /// Sets the human-readable title shown in the kind catalog.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description shown in the kind catalog.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn with_route_key(mut self, route_key: String) -> Self {
        self.route_key = route_key;
        self
    }

    /// Returns the normalized route key, empty until registered.
    #[must_use]
    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// Returns the document type produced by this kind.
    #[must_use]
    pub const fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Returns whether contingency recovery is permitted.
    #[must_use]
    pub const fn allows_contingency(&self) -> bool {
        self.allows_contingency
    }

    /// Returns the catalog title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the catalog description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the Rust type name of the decoded request.
    #[must_use]
    pub const fn request_shape(&self) -> &'static str {
        self.request_shape
    }

    /// Decodes `body` into the request shape and prepares the invocation.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` failure carrying the decoder message.
    pub fn decode(&self, ctx: RequestContext, body: Bytes) -> Result<BoxedOutcome, Failure> {
        (self.use_case)(ctx, body)
    }
}

impl fmt::Debug for DocumentKindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentKindDescriptor")
            .field("route_key", &self.route_key)
            .field("document_type", &self.document_type)
            .field("allows_contingency", &self.allows_contingency)
            .field("request_shape", &self.request_shape)
            .finish_non_exhaustive()
    }
}

fn erase<U: UseCase>(use_case: U) -> ErasedUseCase {
    let use_case = Arc::new(use_case);
    Arc::new(move |ctx: RequestContext, body: Bytes| {
        let request: U::Request = serde_json::from_slice(&body)
            .map_err(|e| Failure::validation(format!("Invalid request format: {e}")))?;

        let use_case = Arc::clone(&use_case);
        let execution: BoxedOutcome = Box::pin(async move { use_case.create(&ctx, request).await });
        Ok(execution)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::{fixtures, FailureKind, FnUseCase, ResponseOptions};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct CreateInvoice {
        items: Vec<String>,
    }

    fn invoice_descriptor() -> DocumentKindDescriptor {
        DocumentKindDescriptor::new(
            DocumentType::Invoice,
            FnUseCase::new(|_ctx: RequestContext, req: CreateInvoice| async move {
                if req.items.is_empty() {
                    SubmissionOutcome::rejected(Failure::validation("no items"))
                } else {
                    SubmissionOutcome::accepted(fixtures::invoice_artifact(), ResponseOptions::new())
                }
            }),
        )
    }

    #[test]
    fn test_defaults() {
        let descriptor = invoice_descriptor();
        assert!(!descriptor.allows_contingency());
        assert_eq!(descriptor.title(), DocumentType::Invoice.name());
        assert!(descriptor.route_key().is_empty());
        assert!(descriptor.request_shape().ends_with("CreateInvoice"));
    }

    #[tokio::test]
    async fn test_decode_and_execute() {
        let descriptor = invoice_descriptor();
        let execution = descriptor
            .decode(RequestContext::mock(), Bytes::from_static(br#"{"items":["a"]}"#))
            .expect("valid body decodes");
        assert!(execution.await.is_accepted());
    }

    #[test]
    fn test_decode_error_is_validation() {
        let descriptor = invoice_descriptor();
        let Err(failure) = descriptor.decode(RequestContext::mock(), Bytes::from_static(b"{\"items\":")) else {
            panic!("truncated body must not decode");
        };
        assert_eq!(failure.kind(), FailureKind::Validation);
        assert!(failure.message().starts_with("Invalid request format"));
    }

    #[test]
    fn test_wrong_shape_is_validation() {
        let descriptor = invoice_descriptor();
        let result = descriptor.decode(RequestContext::mock(), Bytes::from_static(br#"{"items":7}"#));
        assert!(matches!(result, Err(f) if f.kind() == FailureKind::Validation));
    }

    #[test]
    fn test_debug_omits_use_case() {
        let rendered = format!("{:?}", invoice_descriptor().allow_contingency(true));
        assert!(rendered.contains("allows_contingency: true"));
    }
}
