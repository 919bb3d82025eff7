//! Submissions through configuration, registry, engine and response boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dte_gateway::prelude::*;
use dte_gateway::server::HttpResponse;
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use serde_json::Value;

const CONFIG: &str = r#"
[server]
base_path = "/facturacion"

[telemetry.metrics]
enabled = false

[contingency]
excluded_document_types = ["05"]

[[contingency.codes]]
cause = "timeout"
code = "02"
reason = "No disponibilidad del servicio"
"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum Scripted {
    Processed,
    Invalid { message: String },
    Unreachable { cause: TransmissionCause },
}

fn kind(document_type: DocumentType) -> DocumentKindDescriptor {
    DocumentKindDescriptor::new(
        document_type,
        FnUseCase::new(move |_ctx: RequestContext, script: Scripted| async move {
            let artifact = dte_gateway::core::fixtures::artifact_for(document_type);
            match script {
                Scripted::Processed => SubmissionOutcome::accepted(
                    artifact,
                    ResponseOptions::new().with_extension("selloRecibido", "2024SELLO"),
                ),
                Scripted::Invalid { message } => {
                    SubmissionOutcome::rejected(Failure::validation(message))
                }
                Scripted::Unreachable { cause } => SubmissionOutcome::rejected_with_artifact(
                    artifact,
                    ResponseOptions::new(),
                    Failure::transmission(cause, "authority did not answer"),
                ),
            }
        }),
    )
}

fn gateway() -> Server {
    let config = ConfigLoader::new()
        .with_string(CONFIG, "toml")
        .unwrap()
        .load()
        .unwrap();

    let mut gateway = Gateway::new(config);
    gateway
        .register("invoices", kind(DocumentType::Invoice).allow_contingency(true))
        .unwrap()
        .register("ccf", kind(DocumentType::CreditFiscalVoucher).allow_contingency(true))
        .unwrap()
        .register("creditnote", kind(DocumentType::CreditNote).allow_contingency(true))
        .unwrap()
        .register("retention", kind(DocumentType::Retention))
        .unwrap();
    gateway.build().unwrap()
}

async fn post(server: &Server, path: &str, body: &str) -> (u16, Value) {
    let request = http::Request::builder()
        .method("POST")
        .uri(path)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap();
    let response: HttpResponse = server.handle(request).await;
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_direct_success() {
    let (status, body) = post(
        &gateway(),
        "/facturacion/dte/invoices",
        r#"{"result": "processed"}"#,
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["selloRecibido"], "2024SELLO");
    assert!(body["data"]["identificacion"]["tipoContingencia"].is_null());
}

#[tokio::test]
async fn test_configured_code_applies_to_ccf() {
    let (status, body) = post(
        &gateway(),
        "/facturacion/dte/ccf",
        r#"{"result": "unreachable", "cause": "timeout"}"#,
    )
    .await;

    assert_eq!(status, 201);
    let ident = &body["data"]["identificacion"];
    assert_eq!(ident["tipoContingencia"], "02");
    assert_eq!(ident["motivoContin"], "No disponibilidad del servicio");
    assert_eq!(ident["tipoDte"], "03");
}

#[tokio::test]
async fn test_default_code_survives_partial_override() {
    let (status, body) = post(
        &gateway(),
        "/facturacion/dte/invoices",
        r#"{"result": "unreachable", "cause": "no_connectivity"}"#,
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["data"]["identificacion"]["tipoContingencia"], "03");
}

#[tokio::test]
async fn test_excluded_type_and_forbidden_kind_fail() {
    let server = gateway();

    let (status, body) = post(
        &server,
        "/facturacion/dte/creditnote",
        r#"{"result": "unreachable", "cause": "service_unavailable"}"#,
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["details"]["cause"], "service_unavailable");

    let (status, _) = post(
        &server,
        "/facturacion/dte/retention",
        r#"{"result": "unreachable", "cause": "service_unavailable"}"#,
    )
    .await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn test_business_failures_pass_through() {
    let server = gateway();

    let (status, body) = post(
        &server,
        "/facturacion/dte/invoices",
        r#"{"result": "invalid", "message": "NRC del receptor requerido"}"#,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "NRC del receptor requerido");

    let (status, _) = post(&server, "/facturacion/dte/invoices", "[1, 2").await;
    assert_eq!(status, 400);

    let (status, _) = post(&server, "/facturacion/dte/unknown", "{}").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_custom_classifier_replaces_table() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut gateway = Gateway::new(DteConfig::development()).with_classifier(
        move |_artifact: Option<&Artifact>, _document_type: DocumentType, _failure: &Failure| {
            seen.fetch_add(1, Ordering::SeqCst);
            ContingencyDecision::applicable("04", "Falla en el sistema del emisor")
        },
    );
    gateway
        .register("ccf", kind(DocumentType::CreditFiscalVoucher).allow_contingency(true))
        .unwrap();
    let server = gateway.build().unwrap();

    let (status, body) = post(
        &server,
        "/api/v1/dte/ccf",
        r#"{"result": "unreachable", "cause": "authority_rejected"}"#,
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["identificacion"]["tipoContingencia"], "04");

    let (status, _) = post(
        &server,
        "/api/v1/dte/ccf",
        r#"{"result": "invalid", "message": "sin items"}"#,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_duplicate_registration_is_reported() {
    let mut gateway = Gateway::new(DteConfig::development());
    gateway.register("ccf", kind(DocumentType::CreditFiscalVoucher)).unwrap();
    let err = gateway
        .register("/ccf/", kind(DocumentType::CreditFiscalVoucher))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Registry(_)));
}
