//! Gateway-originated responses.
//!
//! # Responsibilities
//! - Map admission decisions and forwarding failures to fixed responses
//!
//! # Design Decisions
//! - Bodies are short fixed strings; clients key off the status code
//! - Upstream responses are never rewritten here, they relay verbatim
//!   from the forwarding handler

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejection for a client inside its admission window.
pub fn too_many_requests() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
}

/// Failure to derive any client identity for a request.
pub fn identity_failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "identity resolution failed").into_response()
}

/// The upstream was unreachable or the exchange failed mid-flight.
pub fn upstream_failure() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn rejection_contract_is_stable() {
        let response = too_many_requests();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_text(response).await, "Rate limit exceeded");
    }

    #[tokio::test]
    async fn identity_failure_is_a_server_error() {
        let response = identity_failure();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "identity resolution failed");
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let response = upstream_failure();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_text(response).await, "Upstream request failed");
    }
}
