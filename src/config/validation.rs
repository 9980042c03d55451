//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, addresses parse)
//! - Check the upstream URL is something the forwarder can use
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address `{0}`")]
    InvalidBindAddress(String),

    #[error("invalid upstream url `{0}`: {1}")]
    InvalidUpstreamUrl(String, String),

    #[error("unsupported upstream scheme `{0}`, only http is forwarded")]
    UnsupportedUpstreamScheme(String),

    #[error("upstream url `{0}` has no host")]
    UpstreamUrlMissingHost(String),

    #[error("admission window must be greater than zero")]
    ZeroAdmissionWindow,

    #[error("sweep interval must be greater than zero when set")]
    ZeroSweepInterval,

    #[error("invalid trusted proxy address `{0}`, expected an IP address")]
    InvalidTrustedProxy(String),

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),

    #[error("unknown log format `{0}`, expected `pretty` or `json`")]
    UnknownLogFormat(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::UnsupportedUpstreamScheme(
                    url.scheme().to_string(),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::UpstreamUrlMissingHost(
                    config.upstream.url.clone(),
                ));
            }
        }
        Err(e) => errors.push(ValidationError::InvalidUpstreamUrl(
            config.upstream.url.clone(),
            e.to_string(),
        )),
    }

    if config.admission.window_ms == 0 {
        errors.push(ValidationError::ZeroAdmissionWindow);
    }
    if config.admission.sweep_interval_ms == Some(0) {
        errors.push(ValidationError::ZeroSweepInterval);
    }
    for entry in &config.admission.trusted_proxies {
        if entry.trim().parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidTrustedProxy(entry.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::UnknownLogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = GatewayConfig::default();
        config.admission.window_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroAdmissionWindow));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let mut config = GatewayConfig::default();
        config.admission.sweep_interval_ms = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroSweepInterval));
    }

    #[test]
    fn non_http_upstream_is_rejected() {
        let mut config = GatewayConfig::default();
        config.upstream.url = "https://127.0.0.1:3000".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnsupportedUpstreamScheme(
            "https".to_string()
        )));
    }

    #[test]
    fn unparseable_upstream_is_rejected() {
        let mut config = GatewayConfig::default();
        config.upstream.url = "not a url".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidUpstreamUrl(_, _)
        ));
    }

    #[test]
    fn trusted_proxies_must_be_ip_addresses() {
        let mut config = GatewayConfig::default();
        config.admission.trusted_proxies =
            vec!["127.0.0.1".to_string(), "edge.internal".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidTrustedProxy(
                "edge.internal".to_string()
            )]
        );
    }

    #[test]
    fn metrics_address_is_ignored_when_disabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nonsense".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut config = GatewayConfig::default();
        config.observability.log_format = "xml".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnknownLogFormat("xml".to_string())));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.upstream.url = "ftp://files.internal".to_string();
        config.admission.window_ms = 0;
        config.admission.trusted_proxies = vec!["bogus".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
