//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and returns every
//! failure at once, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.requests_per_second must be a positive number, got {0}")]
    RefillRate(f64),

    #[error("rate_limit.burst_size must be at least 1")]
    ZeroBurst,

    #[error("rate_limit.cleanup_interval_secs must be greater than 0")]
    ZeroCleanupInterval,

    #[error("lookup.tool must not be empty")]
    EmptyTool,

    #[error("lookup.timeout_ms must be greater than 0")]
    ZeroLookupTimeout,

    #[error(
        "timeouts.request_secs ({request_secs}s) must exceed lookup.timeout_ms + lookup.safety_margin_ms ({lookup_ms}ms)"
    )]
    RequestTimeout { request_secs: u64, lookup_ms: u64 },

    #[error("observability.log_format must be \"text\" or \"json\", got {0:?}")]
    LogFormat(String),
}

/// Check a loaded configuration before it is accepted into the system.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let rate = config.rate_limit.requests_per_second;
    if !rate.is_finite() || rate <= 0.0 {
        errors.push(ValidationError::RefillRate(rate));
    }
    if config.rate_limit.burst_size == 0 {
        errors.push(ValidationError::ZeroBurst);
    }
    if config.rate_limit.cleanup_interval_secs == 0 {
        errors.push(ValidationError::ZeroCleanupInterval);
    }

    if config.lookup.tool.trim().is_empty() {
        errors.push(ValidationError::EmptyTool);
    }
    if config.lookup.timeout_ms == 0 {
        errors.push(ValidationError::ZeroLookupTimeout);
    }

    // The dispatcher must get to report its own timeout before the
    // whole-request timeout cuts the handler off.
    let lookup_ms = config
        .lookup
        .timeout_ms
        .saturating_add(config.lookup.safety_margin_ms);
    if config.timeouts.request_secs.saturating_mul(1000) <= lookup_ms {
        errors.push(ValidationError::RequestTimeout {
            request_secs: config.timeouts.request_secs,
            lookup_ms,
        });
    }

    match config.observability.log_format.as_str() {
        "text" | "json" => {}
        other => errors.push(ValidationError::LogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
