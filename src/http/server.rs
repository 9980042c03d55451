//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum Router with the forwarding handler
//! - Wire up middleware (tracing, timeout, request ID, admission)
//! - Bind the server to a listener and drain on shutdown
//! - Forward admitted requests to the single upstream
//!
//! # Data Flow
//! ```text
//! connection
//!     → TraceLayer → RequestIdLayer → TimeoutLayer
//!     → admission_middleware (resolve identity, consult limiter)
//!         ├─ rejected → 429 / 500, request never leaves the gateway
//!         └─ admitted → forward_handler
//!             → rewrite scheme+authority to the upstream
//!             → stamp marker header
//!             → relay the upstream response verbatim
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::admission::{AdmissionDecision, AdmissionGateway};
use crate::config::GatewayConfig;
use crate::http::request::{RequestIdExt, RequestIdLayer, GATEWAY_MARKER, X_GATEWAY};
use crate::http::response;
use crate::observability::metrics;

/// Header a trusted proxy uses to declare the originating client.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Scheme and authority of the upstream this gateway fronts.
///
/// Parsed from the configured URL once at startup; request paths are
/// never taken from it.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
}

/// Error type for upstream target parsing.
#[derive(Debug, Error)]
#[error("invalid upstream url `{url}`: {reason}")]
pub struct InvalidUpstream {
    url: String,
    reason: String,
}

impl UpstreamTarget {
    /// Parse an upstream base URL into its forwarding target.
    pub fn parse(raw: &str) -> Result<Self, InvalidUpstream> {
        let invalid = |reason: &str| InvalidUpstream {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("only http upstreams are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        // Bare IPv6 hosts need brackets back before they can form an
        // authority with a port.
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };
        let authority = Authority::from_str(&authority).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionGateway>,
    pub upstream: UpstreamTarget,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around an admission gateway and upstream.
    pub fn new(
        config: &GatewayConfig,
        admission: Arc<AdmissionGateway>,
        upstream: UpstreamTarget,
    ) -> Self {
        // Initialize HTTP client
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            admission,
            upstream,
            client,
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown channel fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Admission gate, applied before the forwarding handler.
///
/// Rejected requests turn around here with a fixed response; nothing
/// about them reaches the upstream.
async fn admission_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();

    // 1. Collect identity inputs
    let peer_addr = peer.to_string();
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());

    // 2. Decide
    match state.admission.decide(&peer_addr, forwarded, Instant::now()) {
        AdmissionDecision::Forward(client) => {
            tracing::debug!(client = %client, peer = %peer, "Request admitted");
            next.run(request).await
        }
        AdmissionDecision::RateLimited(client) => {
            tracing::warn!(
                client = %client,
                peer = %peer,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            metrics::record_rejection("rate_limited");
            metrics::record_request(&method, StatusCode::TOO_MANY_REQUESTS.as_u16(), started);
            response::too_many_requests()
        }
        AdmissionDecision::Unresolvable(err) => {
            tracing::error!(peer = %peer, error = %err, "Identity resolution failed");
            metrics::record_rejection("identity");
            metrics::record_request(
                &method,
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                started,
            );
            response::identity_failure()
        }
    }
}

/// Forwards an admitted request to the upstream and relays the response.
async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let started = Instant::now();
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Forwarding request"
    );

    let (mut parts, body) = request.into_parts();

    // 1. Rewrite scheme and authority; path and query pass through
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(state.upstream.scheme.clone());
    uri_parts.authority = Some(state.upstream.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream uri");
            metrics::record_request(&method, StatusCode::BAD_GATEWAY.as_u16(), started);
            return response::upstream_failure();
        }
    };

    // 2. Stamp the marker header; everything else is forwarded verbatim
    // (the request ID is already present courtesy of RequestIdLayer)
    parts
        .headers
        .insert(X_GATEWAY, HeaderValue::from_static(GATEWAY_MARKER));

    let upstream_request = Request::from_parts(parts, body);

    // 3. Forward and relay
    match state.client.request(upstream_request).await {
        Ok(upstream_response) => {
            let status = upstream_response.status();
            tracing::debug!(
                request_id = %request_id,
                status = %status,
                "Upstream responded"
            );
            metrics::record_request(&method, status.as_u16(), started);

            let (parts, body) = upstream_response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(&method, StatusCode::BAD_GATEWAY.as_u16(), started);
            response::upstream_failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_target_keeps_explicit_port() {
        let target = UpstreamTarget::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(target.authority().as_str(), "127.0.0.1:3000");
    }

    #[test]
    fn upstream_target_without_port_uses_bare_host() {
        let target = UpstreamTarget::parse("http://upstream.internal").unwrap();
        assert_eq!(target.authority().as_str(), "upstream.internal");
    }

    #[test]
    fn upstream_target_trailing_path_is_ignored() {
        let target = UpstreamTarget::parse("http://127.0.0.1:3000/ignored").unwrap();
        assert_eq!(target.authority().as_str(), "127.0.0.1:3000");
    }

    #[test]
    fn ipv6_upstream_host_is_bracketed() {
        let target = UpstreamTarget::parse("http://[::1]:3000").unwrap();
        assert_eq!(target.authority().as_str(), "[::1]:3000");
    }

    #[test]
    fn non_http_upstream_is_rejected() {
        let err = UpstreamTarget::parse("https://127.0.0.1:3000").unwrap_err();
        assert!(err.to_string().contains("only http"));
    }

    #[test]
    fn garbage_upstream_is_rejected() {
        assert!(UpstreamTarget::parse("not a url").is_err());
    }
}
