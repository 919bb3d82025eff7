//! End-to-end tests over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dte_config::ServerConfig;
use dte_core::{fixtures, DocumentType, FnUseCase, RequestContext, ResponseOptions, SubmissionOutcome};
use dte_dispatch::{DispatchEngine, DocumentKindDescriptor, RegistryBuilder, TableClassifier};
use dte_server::{Server, ShutdownSignal, REQUEST_ID_HEADER};
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

#[derive(Deserialize)]
struct Submission {
    #[serde(default)]
    delay_ms: u64,
}

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    handle: JoinHandle<Result<(), dte_server::ServerError>>,
}

async fn start() -> Running {
    let mut builder = RegistryBuilder::new();
    builder
        .register(
            "invoices",
            DocumentKindDescriptor::new(
                DocumentType::Invoice,
                FnUseCase::new(|_ctx: RequestContext, req: Submission| async move {
                    tokio::time::sleep(Duration::from_millis(req.delay_ms)).await;
                    SubmissionOutcome::accepted(fixtures::invoice_artifact(), ResponseOptions::new())
                }),
            )
            .allow_contingency(true),
        )
        .unwrap();

    let engine = DispatchEngine::new(
        Arc::new(builder.build()),
        Arc::new(TableClassifier::default()),
    );
    let server = Server::new(
        engine,
        ServerConfig {
            http_addr: "127.0.0.1:0".to_string(),
            shutdown_timeout_secs: 2,
            ..ServerConfig::default()
        },
    );

    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    Running {
        addr,
        shutdown,
        handle,
    }
}

async fn send(addr: SocketAddr, method: &str, path: &str, body: &str) -> (StatusCode, String, Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("host", addr.to_string())
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap();

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, request_id, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_serves_health_and_submissions() {
    let running = start().await;

    let (status, request_id, body) = send(running.addr, "GET", "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(request_id.len(), 36);

    let (status, request_id, body) = send(running.addr, "POST", "/api/v1/dte/invoices", "{}").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["request_id"], request_id.as_str());
    assert_eq!(body["data"]["identificacion"]["tipoDte"], "01");

    let (status, _, _) = send(running.addr, "POST", "/api/v1/dte/ccf", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    running.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_in_flight_submission_survives_shutdown() {
    let running = start().await;
    let addr = running.addr;

    let in_flight = tokio::spawn(async move {
        send(addr, "POST", "/api/v1/dte/invoices", r#"{"delay_ms": 200}"#).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    running.shutdown.trigger();

    let (status, _, body) = in_flight.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_new_connections_refused_after_shutdown() {
    let running = start().await;
    running.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();

    assert!(TcpStream::connect(running.addr).await.is_err());
}
