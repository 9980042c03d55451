//! Request admission: who is asking, and may they proceed right now.
//!
//! # Responsibilities
//! - Resolve a client identifier from connection metadata ([`identity`])
//! - Enforce minimum spacing between admissions per identifier ([`limiter`])
//! - Combine the two into a per-request decision ([`gateway`])
//! - Evict identifiers that have gone quiet ([`sweeper`])
//!
//! # Design Decisions
//! - Decisions take the observation instant as a parameter, so every rule
//!   here is testable without sleeping
//! - The HTTP layer depends on this module, never the other way around

pub mod gateway;
pub mod identity;
pub mod limiter;
pub mod sweeper;

pub use gateway::{AdmissionDecision, AdmissionGateway};
pub use identity::{
    select_strategy, ClientId, DirectPeer, IdentityError, IdentityStrategy, TrustedForwardedFor,
    TrustedProxies,
};
pub use limiter::RateLimiter;
pub use sweeper::EvictionSweeper;
