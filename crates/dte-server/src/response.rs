//! Response boundary: turns outcomes and transport errors into HTTP responses.
//!
//! Success bodies look like
//!
//! ```json
//! { "success": true, "data": { ... }, "<extension>": ..., "request_id": "..." }
//! ```
//!
//! and every error, whether it came from the engine or from the transport,
//! uses the [`ErrorEnvelope`](dte_core::ErrorEnvelope) shape.

use bytes::Bytes;
use dte_core::{Failure, ResponseOptions, SubmissionOutcome};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::{Map, Value};

/// Response body type.
pub type ResponseBody = Full<Bytes>;

/// HTTP response produced by the server.
pub type HttpResponse = Response<ResponseBody>;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const RESERVED_KEYS: [&str; 3] = ["success", "data", "request_id"];

/// Maps an engine outcome to its HTTP response.
///
/// `Accepted` becomes 201 with the artifact under `data`, option extensions
/// merged at the top level and option headers copied over. `Rejected`
/// becomes the failure's envelope with its status; a partial artifact is
/// never exposed.
#[must_use]
pub fn outcome_response(outcome: SubmissionOutcome, request_id: &str) -> HttpResponse {
    match outcome {
        SubmissionOutcome::Accepted { artifact, options } => {
            let mut body = Map::new();
            body.insert("success".to_string(), Value::Bool(true));
            body.insert("data".to_string(), artifact.into_value());
            for (key, value) in options.extensions() {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    tracing::warn!(extension = %key, "Dropping response extension that shadows an envelope field");
                    continue;
                }
                body.insert(key.clone(), value.clone());
            }
            body.insert(
                "request_id".to_string(),
                Value::String(request_id.to_string()),
            );

            let mut response = json_response(StatusCode::CREATED, &Value::Object(body), request_id);
            copy_option_headers(&mut response, &options);
            response
        }
        SubmissionOutcome::Rejected { failure, .. } => failure_response(&failure, request_id),
    }
}

/// Renders a failure as an error envelope with the status of its kind.
#[must_use]
pub fn failure_response(failure: &Failure, request_id: &str) -> HttpResponse {
    json_response(
        failure.status_code(),
        &failure.to_envelope(Some(request_id)),
        request_id,
    )
}

/// Renders a transport-level error (405, 408, 413, ...) as an envelope.
///
/// `failure` supplies the message and category; `code` replaces its
/// machine code so clients can tell transport errors apart.
#[must_use]
pub fn transport_error(
    status: StatusCode,
    code: &str,
    failure: &Failure,
    request_id: &str,
) -> HttpResponse {
    let mut envelope = failure.to_envelope(Some(request_id));
    envelope.error.code = code.to_string();
    json_response(status, &envelope, request_id)
}

/// Serializes `body` as JSON with the request id header set.
#[must_use]
pub fn json_response<T: Serialize>(status: StatusCode, body: &T, request_id: &str) -> HttpResponse {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, defect = true, "Failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(
                    br#"{"error":{"code":"INTERNAL_ERROR","message":"Failed to serialize response","category":"internal"}}"#,
                ),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

fn copy_option_headers(response: &mut HttpResponse, options: &ResponseOptions) {
    for (name, value) in options.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(_)) if is_boundary_header(&name) => {
                tracing::warn!(header = %name, "Dropping response header that shadows a boundary header");
            }
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping response header with an invalid name or value"),
        }
    }
}

/// Headers the boundary owns; option headers never replace them.
fn is_boundary_header(name: &HeaderName) -> bool {
    *name == CONTENT_TYPE || *name == CONTENT_LENGTH || name.as_str() == REQUEST_ID_HEADER
}
