//! Admission orchestration.
//!
//! # Data Flow
//!
//! ```text
//! peer address ─┐
//!               ├─> IdentityStrategy ──> ClientId ──> RateLimiter ──> Forward
//! forwarded  ───┘         │                               │
//!                         └──> Unresolvable               └──> RateLimited
//! ```
//!
//! The gateway owns the resolver and shares the limiter with the
//! background sweeper. It knows nothing about HTTP; the server layer maps
//! its decisions onto responses.

use std::sync::Arc;
use std::time::Instant;

use super::identity::{ClientId, IdentityError, IdentityStrategy};
use super::limiter::RateLimiter;

/// Outcome of admitting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Identity resolved and the limiter admitted it.
    Forward(ClientId),
    /// Identity resolved but its window has not elapsed.
    RateLimited(ClientId),
    /// No identity could be derived for the request.
    Unresolvable(IdentityError),
}

/// Resolves a request's identity and consults the rate limiter.
#[derive(Debug)]
pub struct AdmissionGateway {
    resolver: Box<dyn IdentityStrategy>,
    limiter: Arc<RateLimiter>,
}

impl AdmissionGateway {
    pub fn new(resolver: Box<dyn IdentityStrategy>, limiter: Arc<RateLimiter>) -> Self {
        Self { resolver, limiter }
    }

    /// Decide whether the request described by `peer_addr` and the
    /// optional forwarded identity may proceed at `now`.
    ///
    /// Resolution failures are surfaced rather than mapped to a catch-all
    /// identifier: a shared bucket for unidentifiable clients would let
    /// one of them exhaust the window for all.
    pub fn decide(
        &self,
        peer_addr: &str,
        forwarded: Option<&str>,
        now: Instant,
    ) -> AdmissionDecision {
        let id = match self.resolver.resolve(peer_addr, forwarded) {
            Ok(id) => id,
            Err(err) => return AdmissionDecision::Unresolvable(err),
        };
        if self.limiter.admit(&id, now) {
            AdmissionDecision::Forward(id)
        } else {
            AdmissionDecision::RateLimited(id)
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}
