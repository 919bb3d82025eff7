//! HTTP server.
//!
//! One Tokio task per connection, HTTP/1.1 via Hyper. Requests are routed
//! by [`Server::handle`], which is usable without a socket.
//!
//! | Method | Path                          | Handler              |
//! |--------|-------------------------------|----------------------|
//! | GET    | `/health`                     | liveness             |
//! | GET    | `{base_path}/dte/kinds`       | kind catalog         |
//! | POST   | `{base_path}/dte/<route key>` | dispatch engine      |
//!
//! Any other method on those paths gets 405; any other path gets a 404
//! envelope.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dte_config::ServerConfig;
use dte_core::{Failure, RequestContext, RequestId};
use dte_dispatch::DispatchEngine;
use http::header::{HeaderValue, ALLOW};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::{catalog, KindSummary};
use crate::response::{
    failure_response, json_response, outcome_response, transport_error, HttpResponse,
    REQUEST_ID_HEADER,
};
use crate::shutdown::{InFlightTracker, ShutdownSignal};
use crate::{HealthCheck, ServerError};

/// Liveness endpoint path. Not affected by `base_path`.
pub const HEALTH_PATH: &str = "/health";

const DISPATCH_PREFIX: &str = "/dte";
const CATALOG_PATH: &str = "/dte/kinds";

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Catalog,
    /// Carries the path below `base_path`, handed to the engine as is.
    Dispatch(&'a str),
    MethodNotAllowed(&'static str),
    NotFound,
}

#[derive(Serialize)]
struct CatalogBody {
    kinds: Vec<KindSummary>,
}

/// The gateway's HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// use dte_server::{Server, ShutdownSignal};
///
/// let server = Server::new(engine, config.server.clone());
/// server.run().await?;
/// ```
pub struct Server {
    engine: DispatchEngine,
    config: ServerConfig,
    health: HealthCheck,
}

impl Server {
    /// Creates a server in front of `engine`.
    #[must_use]
    pub fn new(engine: DispatchEngine, config: ServerConfig) -> Self {
        Self {
            engine,
            config,
            health: HealthCheck::default(),
        }
    }

    /// Replaces the liveness reporter.
    #[must_use]
    pub fn with_health(mut self, health: HealthCheck) -> Self {
        self.health = health;
        self
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the dispatch engine.
    #[must_use]
    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    /// Returns the liveness reporter.
    #[must_use]
    pub fn health(&self) -> &HealthCheck {
        &self.health
    }

    /// Binds the configured address and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Binds a listener on the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr =
            self.config
                .http_addr
                .parse()
                .map_err(|_| ServerError::InvalidAddress {
                    addr: self.config.http_addr.clone(),
                })?;

        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })
    }

    /// Serves connections from `listener` until `shutdown` fires, then
    /// waits up to `shutdown_timeout_secs` for open connections to finish
    /// their in-flight requests.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        tracing::info!(
            %addr,
            base_path = %self.config.base_path,
            kinds = self.engine.registry().len(),
            contingency_enabled = self.engine.contingency_enabled(),
            "Server listening"
        );

        let server = Arc::new(self);
        let tracker = InFlightTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let guard = tracker.enter();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            server.serve_connection(stream, remote_addr, shutdown).await;
                            drop(guard);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let drain_timeout = Duration::from_secs(server.config.shutdown_timeout_secs);
        tracing::info!(
            active = tracker.active(),
            timeout_secs = drain_timeout.as_secs(),
            "Draining connections"
        );

        tokio::select! {
            () = tracker.drained() => tracing::info!("All connections closed"),
            () = tokio::time::sleep(drain_timeout) => tracing::warn!(
                active = tracker.active(),
                "Drain timeout reached, abandoning open connections"
            ),
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let server = Arc::clone(&self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let shutdown_requested = shutdown.recv();
        tokio::pin!(shutdown_requested);
        let mut draining = false;

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(%remote_addr, error = %e, "Connection closed with error");
                    }
                    break;
                }
                () = &mut shutdown_requested, if !draining => {
                    draining = true;
                    // Lets the current request finish, then closes.
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }

    /// Handles one request.
    ///
    /// Never fails: every problem becomes an error envelope. The request id
    /// comes from a valid `x-request-id` header or is freshly generated, and
    /// is echoed on the response either way.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = request_id_from(req.headers());
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        self.respond(request_id, req).instrument(span).await
    }

    async fn respond<B>(&self, request_id: RequestId, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let rid = request_id.to_string();
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();

        let response = match self.route(&parts.method, path) {
            Route::Health => json_response(StatusCode::OK, &self.health.status(), &rid),
            Route::Catalog => json_response(
                StatusCode::OK,
                &CatalogBody {
                    kinds: catalog(self.engine.registry()),
                },
                &rid,
            ),
            Route::Dispatch(dispatch_path) => match self.read_body(body, &rid).await {
                Ok(bytes) => {
                    let ctx = RequestContext::with_request_id(request_id);
                    let outcome = self.engine.handle(ctx, dispatch_path, bytes).await;
                    outcome_response(outcome, &rid)
                }
                Err(response) => response,
            },
            Route::MethodNotAllowed(allow) => {
                let failure = Failure::validation(format!(
                    "Method {} is not allowed on {path}",
                    parts.method
                ));
                let mut response = transport_error(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "METHOD_NOT_ALLOWED",
                    &failure,
                    &rid,
                );
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static(allow));
                response
            }
            Route::NotFound => {
                failure_response(&Failure::not_found(format!("No route for {path}")), &rid)
            }
        };

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Request completed"
        );
        response
    }

    fn route<'a>(&self, method: &Method, path: &'a str) -> Route<'a> {
        if path == HEALTH_PATH {
            return if method == Method::GET {
                Route::Health
            } else {
                Route::MethodNotAllowed("GET")
            };
        }

        let Some(below_base) = strip_base_path(&self.config.base_path, path) else {
            return Route::NotFound;
        };

        if below_base.trim_end_matches('/') == CATALOG_PATH {
            // A kind registered as "kinds" stays reachable by POST.
            return match *method {
                Method::GET => Route::Catalog,
                Method::POST => Route::Dispatch(below_base),
                _ => Route::MethodNotAllowed("GET, POST"),
            };
        }

        let is_dispatch_path = below_base
            .strip_prefix(DISPATCH_PREFIX)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if !is_dispatch_path {
            return Route::NotFound;
        }

        if method == Method::POST {
            Route::Dispatch(below_base)
        } else {
            Route::MethodNotAllowed("POST")
        }
    }

    /// Collects the body within `body_timeout_ms` and `max_body_bytes`.
    ///
    /// Only collection is timed; the dispatch that follows is not.
    async fn read_body<B>(&self, body: B, request_id: &str) -> Result<Bytes, HttpResponse>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limit = self.config.max_body_bytes;
        let timeout = Duration::from_millis(self.config.body_timeout_ms);

        match tokio::time::timeout(timeout, Limited::new(body, limit).collect()).await {
            Ok(Ok(collected)) => Ok(collected.to_bytes()),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(limit, "Request body too large");
                Err(transport_error(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    &Failure::validation(format!("Request body exceeds {limit} bytes")),
                    request_id,
                ))
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read request body");
                Err(transport_error(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    &Failure::validation(format!("Failed to read request body: {e}")),
                    request_id,
                ))
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.body_timeout_ms, "Request body timed out");
                Err(transport_error(
                    StatusCode::REQUEST_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    &Failure::validation("Request body was not received in time"),
                    request_id,
                ))
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn strip_base_path<'a>(base_path: &str, path: &'a str) -> Option<&'a str> {
    if base_path == "/" {
        return Some(path);
    }
    path.strip_prefix(base_path)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn request_id_from(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .map_or_else(RequestId::new, RequestId::from_uuid)
}
