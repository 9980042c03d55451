//! Request identification and forwarding preparation.
//!
//! # Responsibilities
//! - Generate or propagate a unique request ID (UUID v4)
//! - Add the request ID to responses for correlation
//! - Define the marker header stamped on forwarded requests
//!
//! # Design Decisions
//! - Request ID is added as early as possible, ahead of the admission
//!   gate, so rejected requests are correlatable too
//! - A client-supplied `X-Request-Id` is propagated unchanged
//! - The marker header carries the gateway name and version so an
//!   upstream can tell proxied traffic from direct traffic

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header marking a request as having passed through this gateway.
pub const X_GATEWAY: &str = "x-gateway";

/// Value of the marker header, e.g. `throttlegate/0.1.0`.
pub const GATEWAY_MARKER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A per-request correlation ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Take the ID from the request headers, or generate one.
    pub fn extract_or_generate<B>(req: &Request<B>) -> Self {
        if let Some(value) = req.headers().get(X_REQUEST_ID) {
            if let Ok(value) = value.to_str() {
                if !value.is_empty() {
                    return Self(value.to_string());
                }
            }
        }
        Self::generate()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_value(&self) -> HeaderValue {
        self.0
            .parse()
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request ID layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service wrapper that stamps the request ID on request and response.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = RequestId::extract_or_generate(&req);

        // Visible to handlers and forwarded upstream as-is.
        req.headers_mut()
            .insert(X_REQUEST_ID, request_id.header_value());

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            response
                .headers_mut()
                .insert(X_REQUEST_ID, request_id.header_value());

            Ok(response)
        })
    }
}

/// Extension trait to read the request ID off a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_request_id_is_propagated() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "existing-id-123")
            .body(Body::empty())
            .unwrap();

        let id = RequestId::extract_or_generate(&req);
        assert_eq!(id.as_str(), "existing-id-123");
    }

    #[test]
    fn missing_request_id_generates_a_uuid() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let id = RequestId::extract_or_generate(&req);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn empty_request_id_generates_a_uuid() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "")
            .body(Body::empty())
            .unwrap();

        let id = RequestId::extract_or_generate(&req);
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn request_id_ext_reads_the_header() {
        let req = Request::builder()
            .header(X_REQUEST_ID, "test-id")
            .body(Body::empty())
            .unwrap();
        assert_eq!(req.request_id(), Some("test-id"));

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bare.request_id(), None);
    }

    #[test]
    fn marker_carries_name_and_version() {
        let (name, version) = GATEWAY_MARKER.split_once('/').unwrap();
        assert!(!name.is_empty());
        assert!(!version.is_empty());
        assert!(HeaderValue::from_str(GATEWAY_MARKER).is_ok());
    }
}
