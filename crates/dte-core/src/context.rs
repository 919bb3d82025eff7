//! Request context types.
//!
//! The [`RequestContext`] carries per-request state from the HTTP boundary
//! through the dispatch engine and into the use-case handler.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each submission request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for a burst of
/// submissions sortable by arrival.
///
/// # Example
///
/// ```
/// use dte_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    ///
    /// Used when the caller supplied an `x-request-id` header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request context handed to the engine and the use case.
///
/// The context is cheap to clone and holds no mutable shared state, so
/// concurrent submissions never observe each other.
///
/// # Example
///
/// ```
/// use dte_core::RequestContext;
///
/// let ctx = RequestContext::new().with_route_key("invoices");
/// assert_eq!(ctx.route_key(), Some("invoices"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,

    /// The registry key the request resolved to, once routing succeeded.
    route_key: Option<String>,

    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new request context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            route_key: None,
            started_at: Instant::now(),
        }
    }

    /// Creates a mock context for testing purposes.
    #[must_use]
    pub fn mock() -> Self {
        Self::new()
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the resolved route key, if routing has happened.
    #[must_use]
    pub fn route_key(&self) -> Option<&str> {
        self.route_key.as_deref()
    }

    /// Returns a new context tagged with the resolved route key.
    #[must_use]
    pub fn with_route_key(mut self, route_key: impl Into<String>) -> Self {
        self.route_key = Some(route_key.into());
        self
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_from_uuid() {
        let uuid = Uuid::now_v7();
        let id = RequestId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_request_id_serializes_transparently() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_request_context_starts_unrouted() {
        let ctx = RequestContext::new();
        assert!(ctx.route_key().is_none());
    }

    #[test]
    fn test_request_context_keeps_id_when_routed() {
        let ctx = RequestContext::new();
        let id = ctx.request_id();
        let routed = ctx.with_route_key("ccf");

        assert_eq!(routed.request_id(), id);
        assert_eq!(routed.route_key(), Some("ccf"));
    }

    #[test]
    fn test_request_context_elapsed() {
        let ctx = RequestContext::new();
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.elapsed() >= Duration::from_millis(10));
    }
}
