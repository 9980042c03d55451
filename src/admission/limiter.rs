//! Minimum-spacing rate limiter.
//!
//! # Responsibilities
//! - Answer admit/reject for a client identifier against a fixed window
//! - Track the last admission instant per identifier
//! - Evict identifiers that have been silent longer than the window
//!
//! # Design Decisions
//! - One instant per identifier is the entire state; there is no token
//!   bucket or counter to replenish
//! - A single mutex guards the whole map: admission checks are a few
//!   nanoseconds of work under the lock, and one lock keeps the
//!   check-then-update step atomic
//! - Rejected requests never touch the stored instant, so a client
//!   retrying inside the window cannot push its own window forward

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::identity::ClientId;

/// Tracks the last admitted instant per client and enforces a minimum
/// spacing between admissions.
///
/// Shared across request handlers and the background sweeper behind an
/// `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct RateLimiter {
    /// Last admission instant per identifier. An identifier absent from
    /// the map has no live window.
    records: Mutex<HashMap<ClientId, Instant>>,
    /// Minimum spacing between admissions of the same identifier.
    window: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Decide whether a request from `id` observed at `now` is admitted.
    ///
    /// First contact is always admitted. Afterwards a request is admitted
    /// exactly when the window has fully elapsed since the last admission;
    /// the boundary instant itself is admitted. Only admission updates the
    /// stored instant.
    pub fn admit(&self, id: &ClientId, now: Instant) -> bool {
        let mut records = self.records.lock().expect("rate limiter mutex poisoned");
        match records.get_mut(id) {
            Some(last_admitted) => {
                // duration_since saturates to zero if `now` reads earlier
                // than the stored instant.
                if now.duration_since(*last_admitted) >= self.window {
                    *last_admitted = now;
                    true
                } else {
                    false
                }
            }
            None => {
                records.insert(id.clone(), now);
                true
            }
        }
    }

    /// Drop every record strictly older than one window before `now` and
    /// return how many were removed.
    ///
    /// A record exactly one window old stays: its identifier is due for
    /// re-admission, and removing it is indistinguishable anyway since
    /// absent identifiers are admitted on first contact. Keeping the
    /// cutoff strict means eviction can never flip a would-be rejection
    /// into an admission.
    pub fn evict(&self, now: Instant) -> usize {
        let mut records = self.records.lock().expect("rate limiter mutex poisoned");
        let before = records.len();
        records.retain(|_, last_admitted| now.duration_since(*last_admitted) <= self.window);
        before - records.len()
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.records.lock().expect("rate limiter mutex poisoned").len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
