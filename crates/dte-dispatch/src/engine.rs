//! The dispatch engine.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use dte_core::{
    Artifact, DocumentType, Failure, FailureKind, RequestContext, ResponseOptions,
    SubmissionOutcome,
};
use dte_telemetry::logging::AUDIT_TARGET;
use dte_telemetry::metrics::{record_contingency, record_failure, record_submission};
use dte_telemetry::SubmissionLabel;
use tracing::Instrument;

use crate::rewrite::{apply_contingency, RewriteError};
use crate::{ContingencyClassifier, ContingencyDecision, DocumentKindDescriptor, Registry};

/// Stages of one dispatch.
///
/// ```text
/// Routing ──▶ Decoding ──▶ Executing ──▶ Succeeded
///    │           │            │
///    │           │            └──▶ ClassifyingFailure ──▶ Rewriting ──▶ Succeeded
///    │           │                        │                  │
///    ▼           ▼                        ▼                  ▼
///  TerminalFailure (NotFound | Validation | original failure | Internal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    /// Resolving the document kind.
    Routing,
    /// Decoding the body into the kind's request shape.
    Decoding,
    /// Running the use case.
    Executing,
    /// Asking the classifier about a transmission failure.
    ClassifyingFailure,
    /// Recording the contingency in the artifact.
    Rewriting,
    /// Finished with an accepted document.
    Succeeded,
    /// Finished with a failure.
    TerminalFailure,
}

impl DispatchStage {
    /// Returns the stage name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::Decoding => "decoding",
            Self::Executing => "executing",
            Self::ClassifyingFailure => "classifying_failure",
            Self::Rewriting => "rewriting",
            Self::Succeeded => "succeeded",
            Self::TerminalFailure => "terminal_failure",
        }
    }
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes submissions to use cases and applies the contingency fallback.
///
/// The engine holds no per-request state and never retries, times out or
/// cancels a use case; it is cheap to clone and safe to share.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use dte_core::{fixtures, DocumentType, FnUseCase, RequestContext, ResponseOptions, SubmissionOutcome};
/// use dte_dispatch::{DispatchEngine, DocumentKindDescriptor, RegistryBuilder, TableClassifier};
///
/// # tokio_test::block_on(async {
/// let mut builder = RegistryBuilder::new();
/// builder.register(
///     "invoices",
///     DocumentKindDescriptor::new(
///         DocumentType::Invoice,
///         FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
///             SubmissionOutcome::accepted(fixtures::invoice_artifact(), ResponseOptions::new())
///         }),
///     ),
/// ).unwrap();
///
/// let engine = DispatchEngine::new(Arc::new(builder.build()), Arc::new(TableClassifier::default()));
/// let outcome = engine
///     .handle(RequestContext::new(), "/dte/invoices", Bytes::from_static(b"{}"))
///     .await;
/// assert!(outcome.is_accepted());
/// # });
/// ```
#[derive(Clone)]
pub struct DispatchEngine {
    registry: Arc<Registry>,
    classifier: Arc<dyn ContingencyClassifier>,
    contingency_enabled: bool,
}

impl DispatchEngine {
    /// Creates an engine with contingency enabled.
    #[must_use]
    pub fn new(registry: Arc<Registry>, classifier: Arc<dyn ContingencyClassifier>) -> Self {
        Self {
            registry,
            classifier,
            contingency_enabled: true,
        }
    }

    /// Turns the contingency fallback on or off for every kind.
    #[must_use]
    pub fn with_contingency_enabled(mut self, enabled: bool) -> Self {
        self.contingency_enabled = enabled;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns whether the contingency fallback is enabled.
    #[must_use]
    pub const fn contingency_enabled(&self) -> bool {
        self.contingency_enabled
    }

    /// Dispatches one submission.
    ///
    /// Never panics and never drops a failure: the result is either the use
    /// case's own outcome, a contingency-rewritten acceptance, or a rejection
    /// produced by routing, decoding or rewriting.
    pub async fn handle(&self, ctx: RequestContext, path: &str, body: Bytes) -> SubmissionOutcome {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %ctx.request_id(),
            path = %path,
            route_key = tracing::field::Empty,
            document_type = tracing::field::Empty,
        );
        self.dispatch(ctx, path, body).instrument(span).await
    }

    async fn dispatch(&self, ctx: RequestContext, path: &str, body: Bytes) -> SubmissionOutcome {
        let descriptor = match self.registry.resolve(path) {
            Ok(descriptor) => descriptor,
            Err(failure) => {
                log_failure(DispatchStage::Routing, &failure);
                record_failure(failure.kind());
                return SubmissionOutcome::rejected(failure);
            }
        };

        let span = tracing::Span::current();
        span.record("route_key", descriptor.route_key());
        span.record("document_type", descriptor.document_type().code());

        let ctx = ctx.with_route_key(descriptor.route_key());
        let document_type = descriptor.document_type();

        let execution = match descriptor.decode(ctx.clone(), body) {
            Ok(execution) => execution,
            Err(failure) => {
                log_failure(DispatchStage::Decoding, &failure);
                return finish(&ctx, document_type, SubmissionOutcome::rejected(failure), false);
            }
        };

        tracing::debug!(stage = %DispatchStage::Executing, "Invoking use case");
        let outcome = execution.await;

        match outcome {
            SubmissionOutcome::Rejected {
                artifact,
                options,
                failure,
            } if self.may_recover(descriptor, &failure) => {
                let (outcome, recovered) = self.recover(descriptor, artifact, options, failure);
                finish(&ctx, document_type, outcome, recovered)
            }
            outcome => {
                if let Some(failure) = outcome.failure() {
                    log_failure(DispatchStage::Executing, failure);
                }
                finish(&ctx, document_type, outcome, false)
            }
        }
    }

    fn may_recover(&self, descriptor: &DocumentKindDescriptor, failure: &Failure) -> bool {
        self.contingency_enabled
            && descriptor.allows_contingency()
            && failure.kind().may_use_contingency()
    }

    fn recover(
        &self,
        descriptor: &DocumentKindDescriptor,
        artifact: Option<Artifact>,
        options: ResponseOptions,
        failure: Failure,
    ) -> (SubmissionOutcome, bool) {
        let document_type = descriptor.document_type();
        tracing::warn!(
            stage = %DispatchStage::ClassifyingFailure,
            cause = ?failure.cause(),
            error = %failure,
            has_artifact = artifact.is_some(),
            "Transmission failed, checking contingency eligibility"
        );

        let (contingency_type, reason) =
            match self
                .classifier
                .classify(artifact.as_ref(), document_type, &failure)
            {
                ContingencyDecision::Applicable {
                    contingency_type,
                    reason,
                } => (contingency_type, reason),
                ContingencyDecision::NotApplicable => {
                    log_failure(DispatchStage::ClassifyingFailure, &failure);
                    return (
                        SubmissionOutcome::Rejected {
                            artifact,
                            options,
                            failure,
                        },
                        false,
                    );
                }
            };

        let rewritten = artifact
            .as_ref()
            .ok_or(RewriteError::MissingArtifact)
            .and_then(|original| apply_contingency(original, &contingency_type, &reason));

        match rewritten {
            Ok(rewritten) => {
                let generation_code = rewritten
                    .identification()
                    .and_then(|ident| ident.generation_code())
                    .unwrap_or_default();
                tracing::info!(
                    target: AUDIT_TARGET,
                    stage = %DispatchStage::Rewriting,
                    document_type = document_type.code(),
                    generation_code,
                    contingency_type = %contingency_type,
                    reason = %reason,
                    cause = ?failure.cause(),
                    transmission_error = %failure.message(),
                    "Document accepted under contingency"
                );
                record_contingency(document_type, &contingency_type);
                (SubmissionOutcome::accepted(rewritten, options), true)
            }
            Err(err) => {
                tracing::error!(
                    stage = %DispatchStage::Rewriting,
                    defect = true,
                    transmission_error = %failure,
                    error = %err,
                    "Contingency rewrite failed"
                );
                // The transmission failure stays reachable as the source.
                let internal = Failure::internal_with_source(
                    format!("Failed to record contingency in document: {err}"),
                    failure,
                );
                (
                    SubmissionOutcome::Rejected {
                        artifact,
                        options,
                        failure: internal,
                    },
                    false,
                )
            }
        }
    }
}

impl fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("kinds", &self.registry.len())
            .field("contingency_enabled", &self.contingency_enabled)
            .finish_non_exhaustive()
    }
}

fn finish(
    ctx: &RequestContext,
    document_type: DocumentType,
    outcome: SubmissionOutcome,
    recovered: bool,
) -> SubmissionOutcome {
    let label = match (&outcome, recovered) {
        (SubmissionOutcome::Accepted { .. }, true) => SubmissionLabel::Contingency,
        (SubmissionOutcome::Accepted { .. }, false) => SubmissionLabel::Accepted,
        (SubmissionOutcome::Rejected { failure, .. }, _) => {
            record_failure(failure.kind());
            SubmissionLabel::Rejected
        }
    };

    let elapsed = ctx.elapsed();
    record_submission(document_type, label, elapsed);

    let stage = if outcome.is_accepted() {
        DispatchStage::Succeeded
    } else {
        DispatchStage::TerminalFailure
    };
    tracing::info!(
        stage = %stage,
        outcome = label.as_str(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Dispatch finished"
    );

    outcome
}

fn log_failure(stage: DispatchStage, failure: &Failure) {
    if failure.kind() == FailureKind::Internal {
        tracing::error!(
            stage = %stage,
            failure_kind = failure.kind().as_str(),
            defect = true,
            error = %failure,
            "Submission failed with an internal error"
        );
    } else {
        tracing::warn!(
            stage = %stage,
            failure_kind = failure.kind().as_str(),
            error = %failure,
            "Submission rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegistryBuilder, TableClassifier};
    use dte_core::{fixtures, FnUseCase, TransmissionCause};

    fn engine_with(
        allows_contingency: bool,
        outcome: fn() -> SubmissionOutcome,
    ) -> DispatchEngine {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "ccf",
                DocumentKindDescriptor::new(
                    DocumentType::CreditFiscalVoucher,
                    FnUseCase::new(move |_ctx: RequestContext, _req: serde_json::Value| async move {
                        outcome()
                    }),
                )
                .allow_contingency(allows_contingency),
            )
            .unwrap();
        DispatchEngine::new(Arc::new(builder.build()), Arc::new(TableClassifier::default()))
    }

    fn timed_out() -> SubmissionOutcome {
        SubmissionOutcome::rejected_with_artifact(
            fixtures::ccf_artifact(),
            ResponseOptions::new().with_extension("attempts", 3),
            Failure::transmission(TransmissionCause::Timeout, "reception timed out"),
        )
    }

    fn timed_out_without_identification() -> SubmissionOutcome {
        SubmissionOutcome::rejected_with_artifact(
            fixtures::artifact_without_identification(),
            ResponseOptions::new(),
            Failure::transmission(TransmissionCause::Timeout, "reception timed out"),
        )
    }

    async fn submit(engine: &DispatchEngine) -> SubmissionOutcome {
        engine
            .handle(RequestContext::mock(), "/api/v1/dte/ccf", Bytes::from_static(b"{}"))
            .await
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(DispatchStage::ClassifyingFailure.to_string(), "classifying_failure");
        assert_eq!(DispatchStage::TerminalFailure.as_str(), "terminal_failure");
    }

    #[tokio::test]
    async fn test_contingency_keeps_options() {
        let outcome = submit(&engine_with(true, timed_out)).await;
        assert!(outcome.is_accepted());
        assert_eq!(outcome.options().extensions()["attempts"], 3);
        let ident = outcome.artifact().unwrap().identification().unwrap();
        assert_eq!(ident.contingency_type(), Some("01"));
    }

    #[tokio::test]
    async fn test_disabled_switch_skips_contingency() {
        let engine = engine_with(true, timed_out).with_contingency_enabled(false);
        assert!(!engine.contingency_enabled());
        let outcome = submit(&engine).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Transmission));
        assert!(!outcome
            .artifact()
            .unwrap()
            .identification()
            .unwrap()
            .is_contingency());
    }

    #[tokio::test]
    async fn test_rewrite_failure_is_internal() {
        let outcome = submit(&engine_with(true, timed_out_without_identification)).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Internal));
        // The partial artifact is still handed back.
        assert!(outcome.artifact().is_some());
    }

    #[tokio::test]
    async fn test_rewrite_failure_keeps_transmission_failure() {
        let outcome = submit(&engine_with(true, timed_out_without_identification)).await;
        let internal = outcome.failure().unwrap();
        assert!(internal.message().contains("identification"));

        let original = std::error::Error::source(internal)
            .and_then(|source| source.downcast_ref::<Failure>())
            .expect("transmission failure chained as source");
        assert_eq!(original.kind(), FailureKind::Transmission);
        assert_eq!(original.cause(), Some(TransmissionCause::Timeout));
        assert_eq!(original.message(), "reception timed out");

        // The chain never reaches the client.
        let envelope = serde_json::to_value(internal.to_envelope(None)).unwrap();
        assert!(!envelope.to_string().contains("reception timed out"));
    }

    #[tokio::test]
    async fn test_applicable_without_artifact_is_internal() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "ccf",
                DocumentKindDescriptor::new(
                    DocumentType::CreditFiscalVoucher,
                    FnUseCase::new(|_ctx: RequestContext, _req: serde_json::Value| async {
                        SubmissionOutcome::rejected(Failure::transmission(
                            TransmissionCause::Timeout,
                            "timeout",
                        ))
                    }),
                )
                .allow_contingency(true),
            )
            .unwrap();
        let always = |_: Option<&Artifact>, _: DocumentType, _: &Failure| {
            ContingencyDecision::applicable("01", "forced")
        };
        let engine = DispatchEngine::new(Arc::new(builder.build()), Arc::new(always));

        let outcome = submit(&engine).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Internal));
        assert!(outcome.artifact().is_none());
    }

    #[test]
    fn test_debug() {
        let engine = engine_with(false, timed_out);
        assert!(format!("{engine:?}").contains("kinds: 1"));
    }
}
