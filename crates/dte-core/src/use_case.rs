//! The use-case contract implemented once per document kind.
//!
//! A use case owns everything kind-specific: validation, tax computation,
//! signing and transmission. The dispatch engine only sees the
//! [`SubmissionOutcome`] it returns.

use crate::{RequestContext, SubmissionOutcome};
use serde::de::DeserializeOwned;
use std::future::Future;

/// A document-kind handler.
///
/// Implementations must not panic: every failure path returns a typed
/// [`Failure`](crate::Failure) inside [`SubmissionOutcome::Rejected`], and a
/// rejected outcome carries the artifact whenever it was at least partially
/// built, so a transmission failure can still be recovered as contingency.
///
/// # Example
///
/// ```rust
/// use dte_core::{
///     Artifact, Failure, RequestContext, ResponseOptions, SubmissionOutcome,
///     TransmissionCause, UseCase,
/// };
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct CreateInvoice {
///     total: f64,
/// }
///
/// struct InvoiceUseCase;
///
/// impl UseCase for InvoiceUseCase {
///     type Request = CreateInvoice;
///
///     async fn create(&self, _ctx: &RequestContext, request: CreateInvoice) -> SubmissionOutcome {
///         let artifact = Artifact::new(json!({
///             "identificacion": { "tipoDte": "01", "tipoContingencia": null, "motivoContin": null },
///             "resumen": { "totalPagar": request.total }
///         }));
///         // Transmission is out of reach in this example.
///         SubmissionOutcome::rejected_with_artifact(
///             artifact,
///             ResponseOptions::default(),
///             Failure::transmission(TransmissionCause::Timeout, "reception timed out"),
///         )
///     }
/// }
/// ```
pub trait UseCase: Send + Sync + 'static {
    /// The decoded request shape for this kind.
    type Request: DeserializeOwned + Send + 'static;

    /// Validates, builds, signs and transmits one document.
    fn create(
        &self,
        ctx: &RequestContext,
        request: Self::Request,
    ) -> impl Future<Output = SubmissionOutcome> + Send;
}

/// A function-based use case.
///
/// Lets an async function or closure stand in for a [`UseCase`]
/// implementation.
///
/// ```rust
/// use dte_core::{FnUseCase, Failure, RequestContext, SubmissionOutcome};
///
/// let use_case = FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
///     SubmissionOutcome::rejected(Failure::validation("empty items"))
/// });
/// # let _ = use_case;
/// ```
pub struct FnUseCase<F, Req, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SubmissionOutcome> + Send,
    Req: DeserializeOwned + Send + 'static,
{
    func: F,
    _phantom: std::marker::PhantomData<fn(Req) -> Fut>,
}

impl<F, Req, Fut> FnUseCase<F, Req, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SubmissionOutcome> + Send,
    Req: DeserializeOwned + Send + 'static,
{
    /// Creates a new function-based use case.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self {
            func,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<F, Req, Fut> UseCase for FnUseCase<F, Req, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SubmissionOutcome> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
{
    type Request = Req;

    fn create(
        &self,
        ctx: &RequestContext,
        request: Req,
    ) -> impl Future<Output = SubmissionOutcome> + Send {
        (self.func)(ctx.clone(), request)
    }
}
