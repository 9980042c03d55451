//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, admission gate)
//!     → request.rs (request ID, forwarding marker)
//!     → upstream exchange
//!     → response.rs (gateway-originated rejection/failure responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{HttpServer, UpstreamTarget};
