//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files; every field has a default so a minimal config (or none at all)
//! still yields a runnable gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sweeps default to a few windows apart: stale records are harmless in
/// the short term, so there is no reason to contend for the limiter lock
/// every window.
const DEFAULT_SWEEP_WINDOW_MULTIPLE: u32 = 4;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Admission control settings.
    pub admission: AdmissionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream base URL (e.g., "http://127.0.0.1:3000"). Only the scheme
    /// and authority are used; request paths pass through unchanged.
    pub url: String,

    /// Total request/response timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Minimum spacing between admissions of the same client, in
    /// milliseconds.
    pub window_ms: u64,

    /// Interval between eviction sweeps in milliseconds. Unset means a
    /// multiple of the window.
    pub sweep_interval_ms: Option<u64>,

    /// Peer IP addresses whose `X-Forwarded-For` header is honored.
    /// Empty means clients are identified by their peer address alone.
    pub trusted_proxies: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_ms: 800,
            sweep_interval_ms: None,
            trusted_proxies: Vec::new(),
        }
    }
}

impl AdmissionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        match self.sweep_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.window() * DEFAULT_SWEEP_WINDOW_MULTIPLE,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
