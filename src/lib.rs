//! Throttlegate: a rate-limiting admission gateway for a single upstream.

pub mod admission;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use admission::{AdmissionGateway, EvictionSweeper, RateLimiter};
pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
